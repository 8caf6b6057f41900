//! Feeling Album Server Library
//!
//! Classifies uploaded event photos by the emotion they show, stores them in an
//! object store and files their URLs per album and category.

pub mod album_store;
pub mod category;
pub mod classifier;
pub mod config;
pub mod object_store;
pub mod pipeline;
pub mod server;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use album_store::{AlbumStore, DocumentAlbumStore, InMemoryDocumentDb, SqliteDocumentDb};
pub use category::{CategorySet, LabelPreset};
pub use classifier::{GeminiClient, SentimentClassifier, VisionModel};
pub use object_store::{GcsObjectStore, LocalObjectStore, ObjectStore};
pub use pipeline::UploadPipeline;
pub use server::{run_server, RequestsLoggingLevel, ServerConfig, ServerState};
