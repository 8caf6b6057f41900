use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use feeling_album_server::album_store::{
    DocumentAlbumStore, DocumentDb, InMemoryDocumentDb, SqliteDocumentDb,
};
use feeling_album_server::category::LabelPreset;
use feeling_album_server::classifier::{GeminiClient, SentimentClassifier};
use feeling_album_server::config::{
    self, AppConfig, DocumentDbSettings, FileConfig, ObjectStoreSettings,
};
use feeling_album_server::object_store::{GcsObjectStore, LocalObjectStore, ObjectStore};
use feeling_album_server::pipeline::UploadPipeline;
use feeling_album_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig, ServerState};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding documents.db. Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// Directory photos are written to when no GCS bucket is configured.
    /// Defaults to <db_dir>/media.
    #[clap(long, value_parser = parse_path)]
    pub media_path: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Externally reachable URL of this server, used in locally stored photo URLs.
    #[clap(long)]
    pub public_base_url: Option<String>,

    /// Store photos in this GCS (or Firebase Storage) bucket instead of locally.
    #[clap(long)]
    pub gcs_bucket: Option<String>,

    /// OAuth2 access token for the GCS bucket.
    #[clap(long, env = "GCS_ACCESS_TOKEN", hide_env_values = true)]
    pub gcs_access_token: Option<String>,

    /// Gemini API key.
    #[clap(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model used for classification.
    #[clap(long)]
    pub gemini_model: Option<String>,

    /// Built-in category label set.
    #[clap(long, value_enum, default_value_t = LabelPreset::Japanese)]
    pub labels: LabelPreset,

    /// Timeout in seconds for model and storage requests.
    #[clap(long, default_value_t = 120)]
    pub http_timeout_sec: u64,

    /// Maximum total size of one upload request, in MiB.
    #[clap(long, default_value_t = 32)]
    pub max_upload_mb: usize,

    /// Keep albums in memory only; nothing survives a restart.
    #[clap(long)]
    pub ephemeral: bool,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            db_dir: args.db_dir.clone(),
            media_path: args.media_path.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            public_base_url: args.public_base_url.clone(),
            gcs_bucket: args.gcs_bucket.clone(),
            gcs_access_token: args.gcs_access_token.clone(),
            gemini_api_key: args.gemini_api_key.clone(),
            gemini_model: args.gemini_model.clone(),
            labels: args.labels,
            http_timeout_sec: args.http_timeout_sec,
            max_upload_mb: args.max_upload_mb,
            ephemeral: args.ephemeral,
        }
    }
}

fn open_document_db(settings: &DocumentDbSettings) -> Result<Arc<dyn DocumentDb>> {
    Ok(match settings {
        DocumentDbSettings::Sqlite { db_path } => {
            info!("Opening document database at {:?}...", db_path);
            Arc::new(SqliteDocumentDb::new(db_path)?)
        }
        DocumentDbSettings::InMemory => {
            info!("Running with an in-memory document database, albums will not persist");
            Arc::new(InMemoryDocumentDb::new())
        }
    })
}

fn open_object_store(
    settings: &ObjectStoreSettings,
    timeout_sec: u64,
) -> Result<(Arc<dyn ObjectStore>, Option<PathBuf>)> {
    Ok(match settings {
        ObjectStoreSettings::Local {
            media_path,
            public_base_url,
        } => {
            std::fs::create_dir_all(media_path)
                .with_context(|| format!("Failed to create media directory {:?}", media_path))?;
            info!("Storing photos under {:?}", media_path);
            (
                Arc::new(LocalObjectStore::new(media_path, public_base_url)),
                Some(media_path.clone()),
            )
        }
        ObjectStoreSettings::Gcs {
            bucket,
            access_token,
            upload_base_url,
            public_base_url,
        } => {
            info!("Storing photos in bucket {}", bucket);
            let store = GcsObjectStore::new(bucket, access_token, timeout_sec)
                .context("Failed to create GCS client")?
                .with_endpoints(upload_base_url, public_base_url);
            (Arc::new(store), None)
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let app_config = AppConfig::resolve(&(&cli_args).into(), file_config)?;

    info!("Initializing metrics...");
    metrics::init_metrics();

    let document_db = open_document_db(&app_config.document_db)?;
    let album_store = Arc::new(DocumentAlbumStore::new(document_db));

    let (object_store, media_dir) =
        open_object_store(&app_config.object_store, app_config.http_timeout_sec)?;

    info!(
        "Classifying with {} into {:?}, unmatched answers filed as '{}'",
        app_config.classifier.model,
        app_config.categories.labels(),
        app_config.categories.unknown_label()
    );
    let model = Arc::new(GeminiClient::new(
        &app_config.classifier.base_url,
        &app_config.classifier.model,
        &app_config.classifier.api_key,
    ));
    let classifier = SentimentClassifier::new(
        model,
        app_config.categories.clone(),
        app_config.generation_options(),
    );

    let pipeline = UploadPipeline::new(classifier, object_store, album_store);
    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        max_upload_bytes: app_config.max_upload_bytes,
        media_dir,
    };

    run_server(ServerState::new(server_config, pipeline)).await
}
