use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use tracing::info;

pub const DEFAULT_TIMESTAMP: &str = "(cast(strftime('%s','now') as int))";

/// Offset added to the schema version before it is written to `PRAGMA user_version`,
/// so that a database created by another tool is never mistaken for one of ours.
pub const BASE_DB_VERSION: usize = 31000;

#[macro_export]
macro_rules! sqlite_column {
    ($name:expr, $sql_type:expr $(, $field:ident = $value:expr)*) => {
        {
            #[allow(unused_mut)]
            let mut column = Column {
                name: $name,
                sql_type: $sql_type,
                is_primary_key: false,
                non_null: false,
                default_value: None,
            };
            $(
                column.$field = $value;
            )*
            column
        }
    };
}

#[derive(Debug, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    fn as_sql(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
            SqlType::Blob => "BLOB",
        }
    }

    fn parse(s: &str) -> Option<&'static SqlType> {
        match s {
            "TEXT" => Some(&SqlType::Text),
            "INTEGER" => Some(&SqlType::Integer),
            "REAL" => Some(&SqlType::Real),
            "BLOB" => Some(&SqlType::Blob),
            _ => None,
        }
    }
}

pub struct Column<'a> {
    pub name: &'a str,
    pub sql_type: &'a SqlType,
    pub is_primary_key: bool,
    pub non_null: bool,
    pub default_value: Option<&'a str>,
}

pub struct Table {
    pub name: &'static str,
    pub columns: &'static [Column<'static>],
    pub indices: &'static [(&'static str, &'static str)],
}

impl Table {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        let columns_sql = self
            .columns
            .iter()
            .map(|column| {
                let mut sql = format!("{} {}", column.name, column.sql_type.as_sql());
                if column.is_primary_key {
                    sql.push_str(" PRIMARY KEY");
                }
                if column.non_null {
                    sql.push_str(" NOT NULL");
                }
                if let Some(default_value) = column.default_value {
                    sql.push_str(&format!(" DEFAULT {}", default_value));
                }
                sql
            })
            .collect::<Vec<_>>()
            .join(", ");
        conn.execute(
            &format!("CREATE TABLE {} ({});", self.name, columns_sql),
            params![],
        )?;

        for (index_name, columns) in self.indices {
            conn.execute(
                &format!("CREATE INDEX {} ON {}({});", index_name, self.name, columns),
                params![],
            )?;
        }
        Ok(())
    }

    fn validate(&self, conn: &Connection) -> Result<()> {
        struct ActualColumn {
            name: String,
            sql_type: String,
            non_null: bool,
            is_primary_key: bool,
        }

        let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", self.name))?;
        let actual_columns = stmt
            .query_map(params![], |row| {
                Ok(ActualColumn {
                    name: row.get(1)?,
                    sql_type: row.get(2)?,
                    non_null: row.get::<_, i32>(3)? == 1,
                    is_primary_key: row.get::<_, i32>(5)? == 1,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if actual_columns.len() != self.columns.len() {
            bail!(
                "Table {} has {} columns, expected {}",
                self.name,
                actual_columns.len(),
                self.columns.len()
            );
        }

        for (actual, expected) in actual_columns.iter().zip(self.columns.iter()) {
            if actual.name != expected.name {
                bail!(
                    "Table {} column name mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    actual.name
                );
            }
            if SqlType::parse(&actual.sql_type) != Some(expected.sql_type) {
                bail!(
                    "Table {} column {} type mismatch: expected {:?}, got {}",
                    self.name,
                    expected.name,
                    expected.sql_type,
                    actual.sql_type
                );
            }
            if actual.non_null != expected.non_null {
                bail!(
                    "Table {} column {} non-null mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.non_null,
                    actual.non_null
                );
            }
            if actual.is_primary_key != expected.is_primary_key {
                bail!(
                    "Table {} column {} primary key mismatch: expected {}, got {}",
                    self.name,
                    expected.name,
                    expected.is_primary_key,
                    actual.is_primary_key
                );
            }
        }

        for (index_name, _) in self.indices {
            let index_exists: bool = conn
                .query_row(
                    "SELECT 1 FROM sqlite_master WHERE type='index' AND name=?1 AND tbl_name=?2",
                    params![index_name, self.name],
                    |_| Ok(true),
                )
                .unwrap_or(false);
            if !index_exists {
                bail!("Table {} is missing index '{}'", self.name, index_name);
            }
        }
        Ok(())
    }
}

pub struct VersionedSchema {
    pub version: usize,
    pub tables: &'static [Table],
    pub migration: Option<fn(&Connection) -> Result<()>>,
}

impl VersionedSchema {
    pub fn create(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.create(conn)?;
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + self.version),
            [],
        )?;
        Ok(())
    }

    pub fn validate(&self, conn: &Connection) -> Result<()> {
        for table in self.tables {
            table.validate(conn)?;
        }
        Ok(())
    }
}

/// Opens the database at `path`, creating it with the latest schema when it does
/// not exist yet, or validating and migrating it forward otherwise.
pub fn open_versioned_db(path: &Path, schemas: &[VersionedSchema], label: &str) -> Result<Connection> {
    let latest = schemas
        .last()
        .with_context(|| format!("No schema defined for the {} database", label))?;
    let is_new_db = !path.exists();

    let mut conn =
        Connection::open(path).with_context(|| format!("Failed to open {} database", label))?;

    if is_new_db {
        info!("Creating new {} database at {:?}", label, path);
        latest.create(&conn)?;
        return Ok(conn);
    }

    let raw_version: i64 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let db_version = raw_version - BASE_DB_VERSION as i64;
    if db_version < 1 {
        bail!(
            "{} database version {} is invalid (expected >= 1)",
            label,
            db_version
        );
    }
    let db_version = db_version as usize;

    let schema = schemas
        .iter()
        .find(|s| s.version == db_version)
        .with_context(|| format!("Unknown {} database version {}", label, db_version))?;
    schema.validate(&conn).with_context(|| {
        format!(
            "{} database schema validation failed for version {}",
            label, db_version
        )
    })?;

    if db_version < latest.version {
        info!(
            "Migrating {} database from version {} to {}",
            label, db_version, latest.version
        );
        let tx = conn.transaction()?;
        for schema in schemas.iter().filter(|s| s.version > db_version) {
            if let Some(migration_fn) = schema.migration {
                migration_fn(&tx).with_context(|| {
                    format!("Failed to run migration to version {}", schema.version)
                })?;
            }
        }
        tx.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest.version),
            [],
        )?;
        tx.commit()?;
    }

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const NOTES_TABLE_V1: Table = Table {
        name: "notes",
        columns: &[
            sqlite_column!("id", &SqlType::Text, is_primary_key = true),
            sqlite_column!("body", &SqlType::Text, non_null = true),
        ],
        indices: &[],
    };

    const NOTES_TABLE_V2: Table = Table {
        name: "notes",
        columns: &[
            sqlite_column!("id", &SqlType::Text, is_primary_key = true),
            sqlite_column!("body", &SqlType::Text, non_null = true),
            sqlite_column!(
                "created_at",
                &SqlType::Integer,
                non_null = true,
                default_value = Some(DEFAULT_TIMESTAMP)
            ),
        ],
        indices: &[("idx_notes_created_at", "created_at")],
    };

    fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
        conn.execute(
            "ALTER TABLE notes ADD COLUMN created_at INTEGER NOT NULL DEFAULT 0",
            [],
        )?;
        conn.execute("CREATE INDEX idx_notes_created_at ON notes(created_at)", [])?;
        Ok(())
    }

    const V1_ONLY: [VersionedSchema; 1] = [VersionedSchema {
        version: 1,
        tables: &[NOTES_TABLE_V1],
        migration: None,
    }];

    const V1_AND_V2: [VersionedSchema; 2] = [
        VersionedSchema {
            version: 1,
            tables: &[NOTES_TABLE_V1],
            migration: None,
        },
        VersionedSchema {
            version: 2,
            tables: &[NOTES_TABLE_V2],
            migration: Some(migrate_v1_to_v2),
        },
    ];

    fn user_version(conn: &Connection) -> i64 {
        conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn creates_fresh_db_with_latest_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.db");

        let conn = open_versioned_db(&path, &V1_AND_V2, "notes").unwrap();

        assert_eq!(user_version(&conn), (BASE_DB_VERSION + 2) as i64);
        V1_AND_V2[1].validate(&conn).unwrap();
    }

    #[test]
    fn migrates_existing_db_forward() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.db");
        {
            let conn = open_versioned_db(&path, &V1_ONLY, "notes").unwrap();
            conn.execute("INSERT INTO notes (id, body) VALUES ('a', 'hello')", [])
                .unwrap();
        }

        let conn = open_versioned_db(&path, &V1_AND_V2, "notes").unwrap();

        assert_eq!(user_version(&conn), (BASE_DB_VERSION + 2) as i64);
        let body: String = conn
            .query_row("SELECT body FROM notes WHERE id = 'a'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(body, "hello");
    }

    #[test]
    fn rejects_foreign_db() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("CREATE TABLE whatever (x INTEGER)", []).unwrap();
        }

        let result = open_versioned_db(&path, &V1_ONLY, "notes");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("is invalid"));
    }

    #[test]
    fn validation_detects_column_mismatch() {
        let dir = TempDir::new().unwrap();
        let conn = Connection::open(dir.path().join("x.db")).unwrap();
        conn.execute("CREATE TABLE notes (id TEXT PRIMARY KEY, body INTEGER NOT NULL)", [])
            .unwrap();

        let err = V1_ONLY[0].validate(&conn).unwrap_err();
        assert!(err.to_string().contains("type mismatch"));
    }
}
