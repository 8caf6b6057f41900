use super::RequestsLoggingLevel;
use std::path::PathBuf;

#[derive(Clone)]
pub struct ServerConfig {
    pub requests_logging_level: RequestsLoggingLevel,
    pub port: u16,
    pub metrics_port: u16,
    /// Largest accepted request body, covering all images of one upload.
    pub max_upload_bytes: usize,
    /// Served under `/media` when photos are stored on the local filesystem.
    pub media_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            requests_logging_level: RequestsLoggingLevel::Path,
            port: 3001,
            metrics_port: 9091,
            max_upload_bytes: 32 * 1024 * 1024,
            media_dir: None,
        }
    }
}
