//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per endpoint. When API routes or request
//! formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde_json::json;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

fn image_part(bytes: &[u8], index: usize) -> Part {
    Part::bytes(bytes.to_vec())
        .file_name(format!("photo-{}.jpg", index))
        .mime_str("image/jpeg")
        .expect("Invalid mime type")
}

#[allow(dead_code)]
impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    // ========================================================================
    // Upload
    // ========================================================================

    /// Uploads images under the `images` field
    pub async fn upload(&self, album_id: &str, title: Option<&str>, images: &[&[u8]]) -> Response {
        let mut form = Form::new().text("id", album_id.to_string());
        if let Some(title) = title {
            form = form.text("title", title.to_string());
        }
        for (index, image) in images.iter().enumerate() {
            form = form.part("images", image_part(image, index));
        }
        self.send_upload(form).await
    }

    /// Uploads one image under the legacy `image` field
    pub async fn upload_single(&self, album_id: &str, image: &[u8]) -> Response {
        let form = Form::new()
            .text("id", album_id.to_string())
            .part("image", image_part(image, 0));
        self.send_upload(form).await
    }

    pub async fn send_upload(&self, form: Form) -> Response {
        self.client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Upload request failed")
    }

    // ========================================================================
    // Albums
    // ========================================================================

    pub async fn list_albums(&self) -> Response {
        self.client
            .get(format!("{}/albums", self.base_url))
            .send()
            .await
            .expect("List albums request failed")
    }

    pub async fn list_images(&self, album_id: &str, category: &str) -> Response {
        self.client
            .get(format!(
                "{}/images/{}/{}",
                self.base_url,
                urlencoding::encode(album_id),
                urlencoding::encode(category)
            ))
            .send()
            .await
            .expect("List images request failed")
    }

    // ========================================================================
    // Classification
    // ========================================================================

    pub async fn classify_multipart(&self, image: &[u8]) -> Response {
        let form = Form::new().part("image", image_part(image, 0));
        self.client
            .post(format!("{}/classify", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Classify request failed")
    }

    pub async fn classify_base64(&self, encoded: &str) -> Response {
        self.client
            .post(format!("{}/classify", self.base_url))
            .json(&json!({ "image": encoded }))
            .send()
            .await
            .expect("Classify request failed")
    }

    pub async fn analyze(&self, text: Option<&str>) -> Response {
        let body = match text {
            Some(text) => json!({ "text": text }),
            None => json!({}),
        };
        self.client
            .post(format!("{}/analyze", self.base_url))
            .json(&body)
            .send()
            .await
            .expect("Analyze request failed")
    }

    /// Fetches an absolute URL returned by the server (e.g., a photo URL)
    pub async fn get_url(&self, url: &str) -> Response {
        self.client
            .get(url)
            .send()
            .await
            .expect("Request failed")
    }
}
