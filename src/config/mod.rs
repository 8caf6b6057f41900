mod file_config;

pub use file_config::{CategoriesConfig, ClassifierConfig, FileConfig, StorageConfig};

use crate::category::{CategorySet, LabelPreset, DEFAULT_UNKNOWN_LABEL};
use crate::classifier::{GenerationOptions, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use crate::object_store::{DEFAULT_GCS_PUBLIC_BASE_URL, DEFAULT_GCS_UPLOAD_BASE_URL};
use crate::server::RequestsLoggingLevel;
use anyhow::{anyhow, bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub media_path: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub public_base_url: Option<String>,
    pub gcs_bucket: Option<String>,
    pub gcs_access_token: Option<String>,
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub labels: LabelPreset,
    pub http_timeout_sec: u64,
    pub max_upload_mb: usize,
    pub ephemeral: bool,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub http_timeout_sec: u64,
    pub max_upload_bytes: usize,

    pub document_db: DocumentDbSettings,
    pub object_store: ObjectStoreSettings,
    pub classifier: ClassifierSettings,
    pub categories: CategorySet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentDbSettings {
    Sqlite { db_path: PathBuf },
    /// Nothing survives a restart.
    InMemory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreSettings {
    Local {
        media_path: PathBuf,
        public_base_url: String,
    },
    Gcs {
        bucket: String,
        access_token: String,
        upload_base_url: String,
        public_base_url: String,
    },
}

#[derive(Debug, Clone)]
pub struct ClassifierSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let ephemeral = file.ephemeral.unwrap_or(cli.ephemeral);

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone());

        if let Some(db_dir) = &db_dir {
            if !db_dir.exists() {
                bail!("Database directory does not exist: {:?}", db_dir);
            }
            if !db_dir.is_dir() {
                bail!("db_dir is not a directory: {:?}", db_dir);
            }
        }

        let document_db = match (&db_dir, ephemeral) {
            (_, true) => DocumentDbSettings::InMemory,
            (Some(db_dir), false) => DocumentDbSettings::Sqlite {
                db_path: db_dir.join("documents.db"),
            },
            (None, false) => bail!(
                "db_dir must be specified via --db-dir or in config file (or run with --ephemeral)"
            ),
        };

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let http_timeout_sec = file.http_timeout_sec.unwrap_or(cli.http_timeout_sec);
        let max_upload_mb = file.max_upload_mb.unwrap_or(cli.max_upload_mb);
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| anyhow!("max_upload_mb is too large: {}", max_upload_mb))?;

        let storage = file.storage.unwrap_or_default();
        let gcs_bucket = storage.gcs_bucket.or_else(|| cli.gcs_bucket.clone());
        let backend = storage
            .backend
            .unwrap_or_else(|| if gcs_bucket.is_some() { "gcs" } else { "local" }.to_string());

        let object_store = match backend.to_ascii_lowercase().as_str() {
            "local" => {
                let media_path = file
                    .media_path
                    .map(PathBuf::from)
                    .or_else(|| cli.media_path.clone())
                    .or_else(|| db_dir.as_ref().map(|d| d.join("media")))
                    .ok_or_else(|| {
                        anyhow!("media_path must be specified when there is no db_dir")
                    })?;
                let public_base_url = file
                    .public_base_url
                    .or_else(|| cli.public_base_url.clone())
                    .unwrap_or_else(|| format!("http://localhost:{}", port));
                ObjectStoreSettings::Local {
                    media_path,
                    public_base_url,
                }
            }
            "gcs" => {
                let bucket = gcs_bucket.ok_or_else(|| {
                    anyhow!("gcs_bucket must be specified for the gcs storage backend")
                })?;
                let access_token = cli.gcs_access_token.clone().ok_or_else(|| {
                    anyhow!("GCS_ACCESS_TOKEN must be set for the gcs storage backend")
                })?;
                ObjectStoreSettings::Gcs {
                    bucket,
                    access_token,
                    upload_base_url: storage
                        .gcs_upload_base_url
                        .unwrap_or_else(|| DEFAULT_GCS_UPLOAD_BASE_URL.to_string()),
                    public_base_url: storage
                        .gcs_public_base_url
                        .unwrap_or_else(|| DEFAULT_GCS_PUBLIC_BASE_URL.to_string()),
                }
            }
            other => bail!("Unknown storage backend '{}', expected local or gcs", other),
        };

        let classifier_file = file.classifier.unwrap_or_default();
        let classifier = ClassifierSettings {
            api_key: classifier_file
                .api_key
                .or_else(|| cli.gemini_api_key.clone())
                .ok_or_else(|| {
                    anyhow!("GEMINI_API_KEY must be set or api_key given in [classifier]")
                })?,
            model: classifier_file
                .model
                .or_else(|| cli.gemini_model.clone())
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: classifier_file
                .base_url
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            temperature: classifier_file
                .temperature
                .unwrap_or(GenerationOptions::default().temperature),
            max_output_tokens: classifier_file.max_output_tokens,
        };

        let categories = resolve_categories(cli.labels, file.categories.unwrap_or_default())?;

        Ok(Self {
            port,
            metrics_port,
            logging_level,
            http_timeout_sec,
            max_upload_bytes,
            document_db,
            object_store,
            classifier,
            categories,
        })
    }

    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.classifier.temperature,
            max_output_tokens: self.classifier.max_output_tokens,
            timeout: Duration::from_secs(self.http_timeout_sec),
        }
    }
}

fn resolve_categories(cli_preset: LabelPreset, file: CategoriesConfig) -> Result<CategorySet> {
    let preset = match file.preset {
        Some(name) => LabelPreset::from_str(&name, true)
            .map_err(|_| anyhow!("Unknown label preset '{}', expected japanese or english", name))?,
        None => cli_preset,
    };

    if file.labels.is_none() && file.unknown_label.is_none() && file.prompt_template.is_none() {
        return Ok(CategorySet::from_preset(preset));
    }

    let labels = file
        .labels
        .unwrap_or_else(|| preset.labels().iter().map(|l| l.to_string()).collect());
    let prompt_template = file
        .prompt_template
        .unwrap_or_else(|| preset.prompt_template().to_string());

    CategorySet::with_prompt_template(
        labels,
        file.unknown_label
            .unwrap_or_else(|| DEFAULT_UNKNOWN_LABEL.to_string()),
        &prompt_template,
    )
    .context("Invalid [categories] configuration")
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
