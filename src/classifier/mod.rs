//! Vision model abstraction layer.
//!
//! A trait-based abstraction over multimodal model backends plus the
//! sentiment classifier built on top of it.

mod gemini;
mod provider;
mod sentiment;

pub use gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
pub use provider::{
    ClassifierError, GenerationOptions, ImageInput, VisionModel, FALLBACK_IMAGE_MIME,
};
pub use sentiment::SentimentClassifier;
