//! Public object storage for classified photos.

mod gcs;
mod local;

pub use gcs::{GcsObjectStore, DEFAULT_GCS_PUBLIC_BASE_URL, DEFAULT_GCS_UPLOAD_BASE_URL};
pub use local::{LocalObjectStore, MEDIA_ROUTE_PREFIX};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Every photo is stored as JPEG, whatever its actual encoding.
pub const PHOTO_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("Invalid object path '{0}'")]
    InvalidPath(String),

    #[error("Storage connection error: {0}")]
    Connection(String),

    #[error("Storage API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Stores `bytes` at `path`, makes the object publicly readable and
    /// returns its public URL.
    async fn put_public(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError>;
}

/// Object path for a photo: `<label>/<UTC timestamp to the second>-<random suffix>.jpg`.
pub fn photo_object_path(label: &str, now: DateTime<Utc>) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}/{}-{}.jpg", label, now.format("%Y%m%d%H%M%S"), &suffix[..8])
}

/// Percent-encodes every segment of an object path, keeping the `/` separators.
pub fn encode_object_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn validate_object_path(path: &str) -> Result<(), ObjectStoreError> {
    let is_valid = !path.is_empty()
        && !path.starts_with('/')
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if is_valid {
        Ok(())
    } else {
        Err(ObjectStoreError::InvalidPath(path.to_string()))
    }
}
