//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own document database, media
//! directory and fake Gemini endpoint.

use super::constants::*;
use super::fake_gemini::FakeGemini;
use feeling_album_server::album_store::{AlbumStore, DocumentAlbumStore, SqliteDocumentDb};
use feeling_album_server::category::{CategorySet, LabelPreset};
use feeling_album_server::classifier::{GeminiClient, GenerationOptions, SentimentClassifier};
use feeling_album_server::object_store::LocalObjectStore;
use feeling_album_server::pipeline::UploadPipeline;
use feeling_album_server::server::{make_app, RequestsLoggingLevel, ServerConfig, ServerState};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Album store for direct inspection in tests
    pub album_store: Arc<dyn AlbumStore>,

    /// Directory locally stored photos are written to
    pub media_dir: PathBuf,

    /// The fake model endpoint behind this server
    pub gemini: FakeGemini,

    // Private fields - keep resources alive until drop
    _temp_dir: Option<TempDir>,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a new test server on a random port with fresh storage
    pub async fn spawn() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let mut server = Self::spawn_in(temp_dir.path()).await;
        server._temp_dir = Some(temp_dir);
        server
    }

    /// Spawns a test server whose database and media live under `data_dir`,
    /// so a later server can reopen them.
    pub async fn spawn_in(data_dir: &Path) -> Self {
        let gemini = FakeGemini::spawn().await;

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let document_db = Arc::new(
            SqliteDocumentDb::new(data_dir.join("documents.db"))
                .expect("Failed to open document database"),
        );
        let album_store: Arc<dyn AlbumStore> = Arc::new(DocumentAlbumStore::new(document_db));

        let media_dir = data_dir.join("media");
        std::fs::create_dir_all(&media_dir).expect("Failed to create media dir");
        let object_store = Arc::new(LocalObjectStore::new(&media_dir, &base_url));

        let model = Arc::new(GeminiClient::new(&gemini.base_url, TEST_MODEL, TEST_API_KEY));
        let classifier = SentimentClassifier::new(
            model,
            CategorySet::from_preset(LabelPreset::English),
            GenerationOptions {
                timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
                ..Default::default()
            },
        );
        let pipeline = UploadPipeline::new(classifier, object_store, album_store.clone());

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            media_dir: Some(media_dir.clone()),
            ..Default::default()
        };
        let app = make_app(ServerState::new(config, pipeline));

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            album_store,
            media_dir,
            gemini,
            _temp_dir: None,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling `GET /`
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
