//! Filesystem-backed object store, served read-only by the HTTP server under `/media`.

use super::{encode_object_path, validate_object_path, ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

pub const MEDIA_ROUTE_PREFIX: &str = "/media";

pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    /// # Arguments
    /// * `root` - Directory objects are written under. Created if missing.
    /// * `public_base_url` - Externally reachable URL of this server (e.g., "http://localhost:3001").
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        let public_base_url: String = public_base_url.into();
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}{}/{}",
            self.public_base_url,
            MEDIA_ROUTE_PREFIX,
            encode_object_path(path)
        )
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put_public(
        &self,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        validate_object_path(path)?;

        let dest = self.root.join(path);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!("Writing {} bytes to {:?}", bytes.len(), dest);
        tokio::fs::write(&dest, &bytes).await?;

        Ok(self.public_url(path))
    }
}
