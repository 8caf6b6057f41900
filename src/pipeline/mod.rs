//! Upload pipeline: registers the album, then classifies, stores and records
//! each image in order.

use crate::album_store::{AlbumStore, AlbumStoreError};
use crate::category::Classification;
use crate::classifier::{ClassifierError, ImageInput, SentimentClassifier};
use crate::object_store::{photo_object_path, ObjectStore, ObjectStoreError, PHOTO_CONTENT_TYPE};
use crate::server::metrics;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One file received with an upload.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub album_id: String,
    pub title: Option<String>,
    pub images: Vec<UploadedImage>,
}

/// A processed image: the category it was filed under and its public URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPhoto {
    pub category: String,
    pub url: String,
}

/// Image positions are 1-based.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Album id is required")]
    MissingAlbumId,

    #[error("No images provided")]
    NoImages,

    #[error("Image {index} is empty")]
    EmptyImage { index: usize },

    #[error("Failed to register album '{album_id}': {source}")]
    Album {
        album_id: String,
        #[source]
        source: AlbumStoreError,
    },

    #[error("Failed to classify image {index}: {source}")]
    Classification {
        index: usize,
        #[source]
        source: ClassifierError,
    },

    #[error("Failed to store image {index}: {source}")]
    Storage {
        index: usize,
        #[source]
        source: ObjectStoreError,
    },

    #[error("Failed to record image {index}: {source}")]
    Record {
        index: usize,
        #[source]
        source: AlbumStoreError,
    },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl PipelineError {
    /// Whether the caller sent something unusable, as opposed to a failure
    /// of one of the backing services.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            PipelineError::MissingAlbumId
                | PipelineError::NoImages
                | PipelineError::EmptyImage { .. }
        )
    }

    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::MissingAlbumId
            | PipelineError::NoImages
            | PipelineError::EmptyImage { .. } => "validation",
            PipelineError::Album { .. } => "album",
            PipelineError::Classification { .. } => "classification",
            PipelineError::Storage { .. } => "storage",
            PipelineError::Record { .. } => "record",
            PipelineError::Task(_) => "task",
        }
    }
}

#[derive(Clone)]
pub struct UploadPipeline {
    classifier: SentimentClassifier,
    object_store: Arc<dyn ObjectStore>,
    album_store: Arc<dyn AlbumStore>,
}

impl UploadPipeline {
    pub fn new(
        classifier: SentimentClassifier,
        object_store: Arc<dyn ObjectStore>,
        album_store: Arc<dyn AlbumStore>,
    ) -> Self {
        Self {
            classifier,
            object_store,
            album_store,
        }
    }

    pub fn classifier(&self) -> &SentimentClassifier {
        &self.classifier
    }

    pub fn album_store(&self) -> &Arc<dyn AlbumStore> {
        &self.album_store
    }

    /// Runs the whole upload. Stops at the first failing image; images
    /// processed before it stay stored and recorded.
    pub async fn process(&self, request: UploadRequest) -> Result<Vec<StoredPhoto>, PipelineError> {
        let result = self.process_inner(request).await;
        if let Err(err) = &result {
            metrics::record_upload_failure(err.stage());
        }
        result
    }

    async fn process_inner(&self, request: UploadRequest) -> Result<Vec<StoredPhoto>, PipelineError> {
        let album_id = request.album_id.trim().to_string();
        if album_id.is_empty() {
            return Err(PipelineError::MissingAlbumId);
        }
        if request.images.is_empty() {
            return Err(PipelineError::NoImages);
        }
        if let Some(position) = request.images.iter().position(|i| i.bytes.is_empty()) {
            return Err(PipelineError::EmptyImage {
                index: position + 1,
            });
        }
        let title = request
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        self.register_album(&album_id, title).await?;

        let total = request.images.len();
        info!(album_id = %album_id, images = total, "Processing upload");

        let mut stored = Vec::with_capacity(total);
        for (position, image) in request.images.into_iter().enumerate() {
            let index = position + 1;
            let photo = self
                .process_image(&album_id, index, image)
                .await
                .inspect_err(|e| warn!(album_id = %album_id, "Upload aborted: {}", e))?;
            debug!(
                album_id = %album_id,
                category = %photo.category,
                "Image {}/{} stored",
                index,
                total
            );
            stored.push(photo);
        }

        Ok(stored)
    }

    async fn register_album(&self, album_id: &str, title: Option<String>) -> Result<(), PipelineError> {
        let store = self.album_store.clone();
        let id = album_id.to_string();
        let result = tokio::task::spawn_blocking(move || match title {
            Some(title) => store.upsert_album_title(&id, &title),
            None => store.ensure_album(&id),
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))?;

        result.map_err(|source| PipelineError::Album {
            album_id: album_id.to_string(),
            source,
        })
    }

    async fn process_image(
        &self,
        album_id: &str,
        index: usize,
        image: UploadedImage,
    ) -> Result<StoredPhoto, PipelineError> {
        debug!(
            album_id = %album_id,
            file_name = image.file_name.as_deref().unwrap_or("<unnamed>"),
            "Classifying image {}",
            index
        );
        let input = ImageInput::from_bytes(image.bytes);
        let classification = self
            .classify_only(&input)
            .await
            .map_err(|source| PipelineError::Classification { index, source })?;

        let path = photo_object_path(&classification.category, Utc::now());
        let url = self
            .object_store
            .put_public(&path, input.bytes, PHOTO_CONTENT_TYPE)
            .await
            .map_err(|source| PipelineError::Storage { index, source })?;

        let store = self.album_store.clone();
        let (id, category, photo_url) = (
            album_id.to_string(),
            classification.category.clone(),
            url.clone(),
        );
        tokio::task::spawn_blocking(move || store.append_photo(&id, &category, &photo_url))
            .await
            .map_err(|e| PipelineError::Task(e.to_string()))?
            .map_err(|source| PipelineError::Record { index, source })?;

        Ok(StoredPhoto {
            category: classification.category,
            url,
        })
    }

    /// Classifies an image without storing or recording it.
    pub async fn classify_only(&self, image: &ImageInput) -> Result<Classification, ClassifierError> {
        let classification = self.classifier.classify(image).await?;
        metrics::record_classification(&classification.category);
        Ok(classification)
    }
}
