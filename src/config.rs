//! YAML configuration file support.
//!
//! All tunables for the duplicate-detection core live in one YAML file:
//! the embedding provider section and the detector section. Example:
//!
//! ```yaml
//! version: "1.0"
//! name: "staging"
//!
//! embedding:
//!   mode: remote
//!   api_url: "https://api.example.com/v1/embeddings"
//!   model_name: "bge-small-en-v1.5"
//!   api_key_env: "HEDEX_EMBEDDING_API_KEY"
//!   timeout_ms: 10000
//!   max_retries: 2
//!   normalize: true
//!
//! detector:
//!   similarity_threshold: 0.85
//!   embed_timeout_ms: 10000
//! ```
//!
//! Vector dimensionality is deliberately not configurable: it derives from
//! the provider and is validated by the index at first insert or rebuild.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dedup::DetectorConfig;
use embedding::EmbeddingConfig;

/// Errors that can occur when loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration for the duplicate-detection core.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct HedexConfig {
    /// Configuration format version.
    pub version: String,

    /// Optional configuration name/description.
    #[serde(default)]
    pub name: Option<String>,

    /// Embedding provider configuration.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Duplicate-detector configuration.
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl HedexConfig {
    /// Load a YAML configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: HedexConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => {}
            v => return Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }
        self.embedding
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        self.detector
            .validate()
            .map_err(|e| ConfigLoadError::Validation(e.to_string()))?;
        Ok(())
    }
}

impl Default for HedexConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: None,
            embedding: EmbeddingConfig::default(),
            detector: DetectorConfig::default(),
        }
    }
}
