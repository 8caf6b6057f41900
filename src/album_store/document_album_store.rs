use super::document_db::DocumentDb;
use super::{AlbumStore, AlbumStoreError, AlbumSummary, CategoryImages};
use crate::server::metrics;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Document holding album id → category → photo URLs.
pub const PHOTOS_DOCUMENT_ID: &str = "event_photos";
/// Document holding album id → title.
pub const ALBUMS_DOCUMENT_ID: &str = "event_albums";
pub const DEFAULT_MAX_UPDATE_ATTEMPTS: usize = 16;

type PhotosDocument = BTreeMap<String, CategoryImages>;
type AlbumsDocument = BTreeMap<String, String>;

/// [`AlbumStore`] on top of any [`DocumentDb`].
pub struct DocumentAlbumStore {
    db: Arc<dyn DocumentDb>,
    max_attempts: usize,
}

impl DocumentAlbumStore {
    pub fn new(db: Arc<dyn DocumentDb>) -> Self {
        Self {
            db,
            max_attempts: DEFAULT_MAX_UPDATE_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn read<T: DeserializeOwned + Default>(&self, doc_id: &str) -> Result<T, AlbumStoreError> {
        match self.db.get(doc_id)? {
            Some(stored) => parse_document(doc_id, &stored.body),
            None => Ok(T::default()),
        }
    }

    /// Read-modify-write loop. `mutate` returns false when the document needs no
    /// change, in which case nothing is written.
    fn update<T, F>(&self, doc_id: &str, mut mutate: F) -> Result<(), AlbumStoreError>
    where
        T: DeserializeOwned + Serialize + Default,
        F: FnMut(&mut T) -> bool,
    {
        for attempt in 1..=self.max_attempts {
            let (revision, mut document) = match self.db.get(doc_id)? {
                Some(stored) => (Some(stored.revision), parse_document(doc_id, &stored.body)?),
                None => (None, T::default()),
            };

            if !mutate(&mut document) {
                return Ok(());
            }

            let body =
                serde_json::to_string(&document).map_err(|source| AlbumStoreError::Serialization {
                    doc_id: doc_id.to_string(),
                    source,
                })?;

            if self.db.compare_and_set(doc_id, revision, &body)? {
                return Ok(());
            }

            debug!(
                "Concurrent update of document '{}' (attempt {}/{}), retrying",
                doc_id, attempt, self.max_attempts
            );
            metrics::record_document_conflict(doc_id);
            std::thread::yield_now();
        }

        warn!(
            "Giving up on document '{}' after {} attempts",
            doc_id, self.max_attempts
        );
        Err(AlbumStoreError::Conflict {
            doc_id: doc_id.to_string(),
            attempts: self.max_attempts,
        })
    }
}

fn parse_document<T: DeserializeOwned>(doc_id: &str, body: &str) -> Result<T, AlbumStoreError> {
    serde_json::from_str(body).map_err(|source| AlbumStoreError::Corrupted {
        doc_id: doc_id.to_string(),
        source,
    })
}

impl AlbumStore for DocumentAlbumStore {
    fn upsert_album_title(&self, album_id: &str, title: &str) -> Result<(), AlbumStoreError> {
        self.update(ALBUMS_DOCUMENT_ID, |albums: &mut AlbumsDocument| {
            if albums.get(album_id).map(String::as_str) == Some(title) {
                return false;
            }
            albums.insert(album_id.to_string(), title.to_string());
            true
        })
    }

    fn ensure_album(&self, album_id: &str) -> Result<(), AlbumStoreError> {
        self.update(ALBUMS_DOCUMENT_ID, |albums: &mut AlbumsDocument| {
            if albums.contains_key(album_id) {
                return false;
            }
            albums.insert(album_id.to_string(), String::new());
            true
        })
    }

    fn append_photo(
        &self,
        album_id: &str,
        category: &str,
        url: &str,
    ) -> Result<(), AlbumStoreError> {
        self.update(PHOTOS_DOCUMENT_ID, |photos: &mut PhotosDocument| {
            photos
                .entry(album_id.to_string())
                .or_default()
                .entry(category.to_string())
                .or_default()
                .push(url.to_string());
            true
        })
    }

    fn list_albums(&self) -> Result<Vec<AlbumSummary>, AlbumStoreError> {
        let albums: AlbumsDocument = self.read(ALBUMS_DOCUMENT_ID)?;
        Ok(albums
            .into_iter()
            .map(|(album_id, title)| AlbumSummary { album_id, title })
            .collect())
    }

    fn list_images(&self, album_id: &str, category: &str) -> Result<Vec<String>, AlbumStoreError> {
        let mut photos: PhotosDocument = self.read(PHOTOS_DOCUMENT_ID)?;
        Ok(photos
            .remove(album_id)
            .and_then(|mut categories| categories.remove(category))
            .unwrap_or_default())
    }

    fn list_all_images(&self, album_id: &str) -> Result<CategoryImages, AlbumStoreError> {
        let mut photos: PhotosDocument = self.read(PHOTOS_DOCUMENT_ID)?;
        Ok(photos.remove(album_id).unwrap_or_default())
    }
}
