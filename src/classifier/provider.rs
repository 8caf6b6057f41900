//! Vision model trait definition.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// MIME type assumed for uploads whose content cannot be sniffed.
pub const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Image payload sent to a vision model.
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImageInput {
    /// Wraps raw upload bytes, sniffing the MIME type from the content.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .filter(|mime| mime.starts_with("image/"))
            .unwrap_or(FALLBACK_IMAGE_MIME)
            .to_string();
        Self { mime_type, bytes }
    }
}

/// Options for a generation request.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_output_tokens: None,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Errors that can occur when talking to a vision model.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Prompt blocked by the model: {0}")]
    Blocked(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Request timeout")]
    Timeout,
}

/// A multimodal model that answers a text prompt, optionally about an image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Get the provider's name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Get the model being used.
    fn model(&self) -> &str;

    /// Generate free text for `prompt`, attaching `image` when given.
    async fn generate(
        &self,
        prompt: &str,
        image: Option<&ImageInput>,
        options: &GenerationOptions,
    ) -> Result<String, ClassifierError>;
}
