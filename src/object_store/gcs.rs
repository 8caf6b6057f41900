//! Google Cloud Storage (and Firebase Storage, which is backed by it) JSON API uploader.

use super::{encode_object_path, validate_object_path, ObjectStore, ObjectStoreError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_GCS_UPLOAD_BASE_URL: &str = "https://storage.googleapis.com";
pub const DEFAULT_GCS_PUBLIC_BASE_URL: &str = "https://storage.googleapis.com";

/// Uploads objects to a bucket with a `publicRead` ACL using an OAuth bearer token.
pub struct GcsObjectStore {
    client: reqwest::Client,
    bucket: String,
    access_token: String,
    upload_base_url: String,
    public_base_url: String,
}

impl GcsObjectStore {
    /// Create a new uploader.
    ///
    /// # Arguments
    /// * `bucket` - Bucket name (e.g., "my-project.appspot.com").
    /// * `access_token` - OAuth2 access token with storage write scope.
    /// * `timeout_sec` - Request timeout in seconds.
    pub fn new(
        bucket: impl Into<String>,
        access_token: impl Into<String>,
        timeout_sec: u64,
    ) -> Result<Self, ObjectStoreError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .map_err(|e| ObjectStoreError::Connection(e.to_string()))?;
        Ok(Self {
            client,
            bucket: bucket.into(),
            access_token: access_token.into(),
            upload_base_url: DEFAULT_GCS_UPLOAD_BASE_URL.to_string(),
            public_base_url: DEFAULT_GCS_PUBLIC_BASE_URL.to_string(),
        })
    }

    /// Overrides the API endpoints, e.g. to target an emulator.
    pub fn with_endpoints(
        mut self,
        upload_base_url: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        self.upload_base_url = upload_base_url.into().trim_end_matches('/').to_string();
        self.public_base_url = public_base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.public_base_url,
            self.bucket,
            encode_object_path(path)
        )
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put_public(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, ObjectStoreError> {
        validate_object_path(path)?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o",
            self.upload_base_url,
            urlencoding::encode(&self.bucket)
        );
        let size = bytes.len();

        debug!(bucket = %self.bucket, path, size, "Uploading object");

        let response = self
            .client
            .post(&url)
            .query(&[
                ("uploadType", "media"),
                ("name", path),
                ("predefinedAcl", "publicRead"),
            ])
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(self.public_url(path))
    }
}
