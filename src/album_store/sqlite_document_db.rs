use super::document_db::{DocumentDb, StoredDocument};
use super::schema::DOCUMENT_VERSIONED_SCHEMAS;
use crate::server::metrics;
use crate::sqlite_persistence::open_versioned_db;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::info;

/// Document database persisted in a single SQLite file.
#[derive(Clone)]
pub struct SqliteDocumentDb {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentDb {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = open_versioned_db(db_path, DOCUMENT_VERSIONED_SCHEMAS, "document")
            .with_context(|| format!("Failed to open document database at {:?}", db_path))?;
        info!("Opened document database at {:?}", db_path);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }
}

impl DocumentDb for SqliteDocumentDb {
    fn get(&self, doc_id: &str) -> Result<Option<StoredDocument>> {
        let start = Instant::now();
        let conn = self.conn.lock().unwrap();
        let document = conn
            .query_row(
                "SELECT revision, body FROM documents WHERE id = ?1",
                params![doc_id],
                |row| {
                    Ok(StoredDocument {
                        revision: row.get(0)?,
                        body: row.get(1)?,
                    })
                },
            )
            .optional()?;
        metrics::record_db_query("document_get", start.elapsed());
        Ok(document)
    }

    fn compare_and_set(
        &self,
        doc_id: &str,
        expected_revision: Option<i64>,
        body: &str,
    ) -> Result<bool> {
        let start = Instant::now();
        let conn = self.conn.lock().unwrap();
        let changed = match expected_revision {
            None => conn.execute(
                "INSERT INTO documents (id, revision, body) VALUES (?1, 1, ?2)
                 ON CONFLICT(id) DO NOTHING",
                params![doc_id, body],
            )?,
            Some(revision) => conn.execute(
                "UPDATE documents
                 SET body = ?1, revision = revision + 1, updated_at = cast(strftime('%s','now') as int)
                 WHERE id = ?2 AND revision = ?3",
                params![body, doc_id, revision],
            )?,
        };
        metrics::record_db_query("document_compare_and_set", start.elapsed());
        Ok(changed == 1)
    }
}
