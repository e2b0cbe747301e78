//! # Embedding providers (`embedding`)
//!
//! ## Purpose
//!
//! `embedding` turns article text into fixed-length `f32` vectors for the
//! similarity index. The crate owns the provider contract and two
//! implementations:
//!
//! - [`RemoteEmbedder`]: calls an OpenAI-style `/embeddings` HTTP endpoint
//!   with bounded retries over a pooled client.
//! - [`StubEmbedder`]: deterministic hash-derived vectors with no I/O, for
//!   tests, demos, and offline runs.
//!
//! Downstream code depends only on [`EmbeddingProvider`], so the concrete
//! model and transport stay swappable.
//!
//! ## Timeouts
//!
//! Providers do not time themselves out. Callers wrap every call in
//! [`embed_with_timeout`] so the deadline is always caller-supplied; an
//! elapsed deadline surfaces as [`EmbedError::Unavailable`], never as an
//! empty or silently-truncated vector.

mod error;
mod normalize;
mod remote;
mod stub;

pub use crate::error::EmbedError;
pub use crate::normalize::l2_normalize_in_place;
pub use crate::remote::RemoteEmbedder;
pub use crate::stub::StubEmbedder;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which provider implementation [`EmbeddingConfig`] selects.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingMode {
    /// Remote HTTP embeddings API.
    Remote,
    /// Deterministic local stub, no network.
    #[default]
    Stub,
}

/// Configuration for embedding generation.
///
/// Serde-friendly so it can be embedded in the top-level YAML config.
/// Vector dimensionality is intentionally absent for remote mode: it is
/// derived from whatever the provider returns and validated by the index,
/// never configured here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Provider selection.
    #[serde(default)]
    pub mode: EmbeddingMode,
    /// Embeddings endpoint URL; required when `mode` is `remote`.
    #[serde(default)]
    pub api_url: Option<String>,
    /// Model identifier sent to the provider.
    #[serde(default = "EmbeddingConfig::default_model_name")]
    pub model_name: String,
    /// Environment variable holding the API key for remote mode.
    #[serde(default = "EmbeddingConfig::default_api_key_env")]
    pub api_key_env: String,
    /// Per-call deadline in milliseconds, applied by the caller.
    #[serde(default = "EmbeddingConfig::default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the initial attempt, transport failures only.
    #[serde(default = "EmbeddingConfig::default_max_retries")]
    pub max_retries: u32,
    /// Base backoff between retries in milliseconds, doubled per attempt.
    #[serde(default = "EmbeddingConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    /// Whether vectors are L2-normalized before being returned.
    #[serde(default = "EmbeddingConfig::default_normalize")]
    pub normalize: bool,
    /// Vector dimension produced by the stub provider.
    #[serde(default = "EmbeddingConfig::default_stub_dimension")]
    pub stub_dimension: usize,
}

impl EmbeddingConfig {
    pub(crate) fn default_model_name() -> String {
        "bge-small-en-v1.5".to_string()
    }

    pub(crate) fn default_api_key_env() -> String {
        "HEDEX_EMBEDDING_API_KEY".to_string()
    }

    pub(crate) fn default_timeout_ms() -> u64 {
        10_000
    }

    pub(crate) fn default_max_retries() -> u32 {
        2
    }

    pub(crate) fn default_retry_backoff_ms() -> u64 {
        250
    }

    pub(crate) fn default_normalize() -> bool {
        true
    }

    pub(crate) fn default_stub_dimension() -> usize {
        384
    }

    /// Per-call deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env).ok().filter(|k| !k.is_empty())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), EmbedError> {
        if self.timeout_ms == 0 {
            return Err(EmbedError::InvalidConfig(
                "timeout_ms must be greater than zero".into(),
            ));
        }
        if self.model_name.trim().is_empty() {
            return Err(EmbedError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        match self.mode {
            EmbeddingMode::Remote => match self.api_url.as_deref() {
                Some(url) if !url.trim().is_empty() => Ok(()),
                _ => Err(EmbedError::InvalidConfig(
                    "api_url is required for remote mode".into(),
                )),
            },
            EmbeddingMode::Stub => {
                if self.stub_dimension == 0 {
                    return Err(EmbedError::InvalidConfig(
                        "stub_dimension must be greater than zero".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            mode: EmbeddingMode::default(),
            api_url: None,
            model_name: Self::default_model_name(),
            api_key_env: Self::default_api_key_env(),
            timeout_ms: Self::default_timeout_ms(),
            max_retries: Self::default_max_retries(),
            retry_backoff_ms: Self::default_retry_backoff_ms(),
            normalize: Self::default_normalize(),
            stub_dimension: Self::default_stub_dimension(),
        }
    }
}

/// Contract every embedding backend implements.
///
/// Implementations return the raw vector; they must not fall back to an
/// empty or zeroed vector on failure; a failed call is an error the caller
/// decides how to handle.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;
}

/// Run `provider.embed(text)` under a caller-supplied deadline.
///
/// An elapsed deadline maps to [`EmbedError::Unavailable`] so that timeout
/// and provider failure follow the same propagation path.
pub async fn embed_with_timeout(
    provider: &dyn EmbeddingProvider,
    text: &str,
    timeout: Duration,
) -> Result<Vec<f32>, EmbedError> {
    match tokio::time::timeout(timeout, provider.embed(text)).await {
        Ok(result) => result,
        Err(_) => Err(EmbedError::Unavailable(format!(
            "embedding call exceeded {}ms deadline",
            timeout.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_stub() {
        let cfg = EmbeddingConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.mode, EmbeddingMode::Stub);
        assert_eq!(cfg.timeout(), Duration::from_millis(10_000));
    }

    #[test]
    fn remote_mode_requires_api_url() {
        let cfg = EmbeddingConfig {
            mode: EmbeddingMode::Remote,
            ..Default::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        assert!(matches!(err, EmbedError::InvalidConfig(msg) if msg.contains("api_url")));
    }

    #[test]
    fn zero_timeout_rejected() {
        let cfg = EmbeddingConfig {
            timeout_ms: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn zero_stub_dimension_rejected() {
        let cfg = EmbeddingConfig {
            stub_dimension: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn config_yaml_defaults_fill_in() {
        let cfg: EmbeddingConfig = serde_json::from_str(r#"{"mode":"stub"}"#).unwrap();
        assert_eq!(cfg.model_name, "bge-small-en-v1.5");
        assert_eq!(cfg.max_retries, 2);
        assert!(cfg.normalize);
    }

    struct SlowProvider;

    #[async_trait]
    impl EmbeddingProvider for SlowProvider {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![1.0])
        }
    }

    #[tokio::test]
    async fn deadline_elapsed_maps_to_unavailable() {
        let provider = SlowProvider;
        let err = embed_with_timeout(&provider, "text", Duration::from_millis(10))
            .await
            .expect_err("deadline should elapse");
        assert!(matches!(err, EmbedError::Unavailable(_)));
    }

    #[tokio::test]
    async fn deadline_not_hit_passes_result_through() {
        let provider = StubEmbedder::new(8, false);
        let vector = embed_with_timeout(&provider, "text", Duration::from_secs(5))
            .await
            .expect("stub should embed");
        assert_eq!(vector.len(), 8);
    }
}
