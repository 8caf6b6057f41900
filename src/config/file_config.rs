use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub media_path: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub public_base_url: Option<String>,
    pub http_timeout_sec: Option<u64>,
    pub max_upload_mb: Option<usize>,
    pub ephemeral: Option<bool>,

    pub classifier: Option<ClassifierConfig>,
    pub storage: Option<StorageConfig>,
    pub categories: Option<CategoriesConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassifierConfig {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// "local" or "gcs"
    pub backend: Option<String>,
    pub gcs_bucket: Option<String>,
    pub gcs_upload_base_url: Option<String>,
    pub gcs_public_base_url: Option<String>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CategoriesConfig {
    /// "japanese" or "english"
    pub preset: Option<String>,
    /// Custom ordered label list, replaces the preset labels.
    pub labels: Option<Vec<String>>,
    pub unknown_label: Option<String>,
    /// Prompt with a `{labels}` placeholder.
    pub prompt_template: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
