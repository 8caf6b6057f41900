//! SQLite schema definitions for the document database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP};

// =============================================================================
// Version 1 - Whole documents with a revision counter
// =============================================================================

/// Documents table - one row per document, body stored as JSON text
const DOCUMENTS_TABLE_V1: Table = Table {
    name: "documents",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("revision", &SqlType::Integer, non_null = true),
        sqlite_column!("body", &SqlType::Text, non_null = true),
        sqlite_column!(
            "updated_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
};

pub const DOCUMENT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 1,
    tables: &[DOCUMENTS_TABLE_V1],
    migration: None,
}];
