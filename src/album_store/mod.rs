//! Album titles and classified photo URLs, kept in two whole documents of a
//! document database.
//!
//! One document maps album id → category → ordered list of photo URLs, the other
//! maps album id → title. Mutations go through a compare-and-set loop on the
//! document revision, so concurrent writers never drop each other's updates.

mod document_album_store;
mod document_db;
mod schema;
mod sqlite_document_db;

pub use document_album_store::{
    DocumentAlbumStore, ALBUMS_DOCUMENT_ID, DEFAULT_MAX_UPDATE_ATTEMPTS, PHOTOS_DOCUMENT_ID,
};
pub use document_db::{DocumentDb, InMemoryDocumentDb, StoredDocument};
pub use schema::DOCUMENT_VERSIONED_SCHEMAS;
pub use sqlite_document_db::SqliteDocumentDb;

use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Photo URLs of one album, grouped by category.
pub type CategoryImages = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlbumSummary {
    pub album_id: String,
    pub title: String,
}

#[derive(Debug, Error)]
pub enum AlbumStoreError {
    #[error("Document database error: {0:#}")]
    Database(#[from] anyhow::Error),

    #[error("Document '{doc_id}' is corrupted: {source}")]
    Corrupted {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize document '{doc_id}': {source}")]
    Serialization {
        doc_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Gave up updating document '{doc_id}' after {attempts} conflicting attempts")]
    Conflict { doc_id: String, attempts: usize },
}

pub trait AlbumStore: Send + Sync {
    /// Sets the title of an album, creating the album if needed. Last write wins.
    fn upsert_album_title(&self, album_id: &str, title: &str) -> Result<(), AlbumStoreError>;

    /// Registers an album with an empty title unless it already exists.
    fn ensure_album(&self, album_id: &str) -> Result<(), AlbumStoreError>;

    /// Appends a photo URL to the album's list for `category`.
    fn append_photo(&self, album_id: &str, category: &str, url: &str)
        -> Result<(), AlbumStoreError>;

    /// All albums, ordered by album id.
    fn list_albums(&self) -> Result<Vec<AlbumSummary>, AlbumStoreError>;

    /// Photo URLs of one album category in insertion order, empty when unknown.
    fn list_images(&self, album_id: &str, category: &str) -> Result<Vec<String>, AlbumStoreError>;

    /// Photo URLs of one album for every category, empty when unknown.
    fn list_all_images(&self, album_id: &str) -> Result<CategoryImages, AlbumStoreError>;
}
