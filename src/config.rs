use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "CLIP2_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Checkpoint the ONNX export was produced from. Informational.
    #[serde(default = "default_model_name")]
    pub name: String,

    #[serde(default = "default_model_url")]
    pub url: String,

    #[serde(default = "default_model_filename")]
    pub filename: String,

    #[serde(default = "default_models_dir")]
    pub models_dir: PathBuf,

    #[serde(default = "default_auto_download")]
    pub auto_download: bool,

    #[serde(default = "default_intra_threads")]
    pub intra_threads: usize,

    /// Connect and read timeout for the model download
    #[serde(default = "default_download_timeout_secs")]
    pub download_timeout_secs: u64,
}

fn default_model_name() -> String {
    "openai/clip-vit-base-patch32".to_string()
}

fn default_model_url() -> String {
    // ONNX export of the ViT-B/32 visual tower
    "https://huggingface.co/Qdrant/clip-ViT-B-32-vision/resolve/main/model.onnx".to_string()
}

fn default_model_filename() -> String {
    "clip-vit-b32-vision.onnx".to_string()
}

fn default_models_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("clip2")
        .join("models")
}

fn default_auto_download() -> bool {
    true
}

fn default_intra_threads() -> usize {
    4
}

fn default_download_timeout_secs() -> u64 {
    60
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            url: default_model_url(),
            filename: default_model_filename(),
            models_dir: default_models_dir(),
            auto_download: default_auto_download(),
            intra_threads: default_intra_threads(),
            download_timeout_secs: default_download_timeout_secs(),
        }
    }
}

impl ModelConfig {
    pub fn model_path(&self) -> PathBuf {
        self.models_dir.join(&self.filename)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RuntimeConfig {
    /// Explicit ONNX Runtime shared library. When set, no search happens.
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    #[default]
    Stderr,
    File,
    Journald,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub target: LogTarget,

    /// Directory for the rolling log file when `target = "file"`
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("clip2")
        .join("logs")
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: LogTarget::default(),
            dir: default_log_dir(),
        }
    }
}

impl Config {
    /// Load from the default location, or `CLIP2_CONFIG` when set.
    ///
    /// A missing file yields the defaults; nothing is written back.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("clip2")
            .join("config.toml")
    }
}
