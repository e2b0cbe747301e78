//! Workspace umbrella crate for the hedex duplicate-detection core.
//!
//! This crate stitches the embedding layer, the similarity index, and the
//! duplicate-detection logic together so callers can stand up the whole
//! subsystem from one configuration value.
//!
//! The surrounding content pipeline (PDF extraction, chunking, LLM
//! rewriting, photo matching, review UI, persistence) lives elsewhere and
//! talks to this core through three calls: classify a candidate before
//! review, notify on publish/unpublish, and rebuild at startup.

pub mod config;

pub use crate::config::{ConfigLoadError, HedexConfig};

pub use dedup::{
    comparison_text, similarity_explanation, ArticleError, ArticleRecord, ArticleStatus,
    ArticleStore, Classification, ConsistencyCoordinator, DetectError, DetectorConfig,
    DuplicateClassifier, MemoryArticleStore, RebuildReport, SimilarityResult, StoreError,
};
pub use embedding::{
    embed_with_timeout, l2_normalize_in_place, EmbedError, EmbeddingConfig, EmbeddingMode,
    EmbeddingProvider, RemoteEmbedder, StubEmbedder,
};
pub use index::{IndexEntry, IndexError, RebuildOutcome, SearchHit, VectorIndex};

use std::sync::Arc;

/// The assembled duplicate-detection core: one shared index, one classifier,
/// one coordinator.
///
/// The index is an explicit owned resource injected into both halves, not
/// ambient global state, so lifecycle (startup rebuild, teardown) stays
/// visible to the caller.
pub struct DedupService {
    pub classifier: DuplicateClassifier,
    pub coordinator: ConsistencyCoordinator,
    pub index: Arc<VectorIndex>,
}

impl DedupService {
    /// Build the core from configuration against the given article store.
    pub fn from_config(
        cfg: &HedexConfig,
        store: Arc<dyn ArticleStore>,
    ) -> Result<Self, DetectError> {
        cfg.validate()
            .map_err(|e| DetectError::InvalidConfig(e.to_string()))?;
        let provider = build_provider(&cfg.embedding)
            .map_err(|e| DetectError::InvalidConfig(e.to_string()))?;
        Self::new(provider, store, cfg.detector.clone())
    }

    /// Build the core from explicit parts.
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn ArticleStore>,
        detector: DetectorConfig,
    ) -> Result<Self, DetectError> {
        let index = Arc::new(VectorIndex::new());
        let classifier =
            DuplicateClassifier::new(provider.clone(), index.clone(), detector.clone())?;
        let coordinator = ConsistencyCoordinator::new(provider, index.clone(), store, &detector);
        Ok(Self {
            classifier,
            coordinator,
            index,
        })
    }
}

impl std::fmt::Debug for DedupService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupService").finish_non_exhaustive()
    }
}

fn build_provider(cfg: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbedError> {
    cfg.validate()?;
    match cfg.mode {
        EmbeddingMode::Remote => Ok(Arc::new(RemoteEmbedder::new(cfg)?)),
        EmbeddingMode::Stub => Ok(Arc::new(StubEmbedder::new(
            cfg.stub_dimension,
            cfg.normalize,
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn service_from_default_config_classifies() {
        let store = Arc::new(MemoryArticleStore::new());
        let service =
            DedupService::from_config(&HedexConfig::default(), store).expect("service builds");

        let result = service
            .classifier
            .classify("How to lower your blood pressure with diet")
            .await
            .expect("classify succeeds");
        assert_eq!(result.classification, Classification::Unique);
        assert_eq!(result.score, 0.0);
    }

    #[tokio::test]
    async fn publish_then_classify_same_text_flags_duplicate() {
        let store = Arc::new(MemoryArticleStore::new());
        let service =
            DedupService::from_config(&HedexConfig::default(), store).expect("service builds");

        let text = "Walking thirty minutes a day helps control blood sugar.";
        let article = ArticleRecord::new("art-1", "Walking and Blood Sugar", text)
            .with_status(ArticleStatus::Approved);
        service.coordinator.on_publish(&article).await.unwrap();

        // The stub embedder is deterministic, so identical text embeds to an
        // identical vector and scores 1.0 against itself.
        let result = service.classifier.classify(text).await.unwrap();
        assert_eq!(result.classification, Classification::Duplicate);
        assert_eq!(result.matched_article_id.as_deref(), Some("art-1"));
    }

    #[test]
    fn remote_config_without_url_fails_service_build() {
        let mut cfg = HedexConfig::default();
        cfg.embedding.mode = EmbeddingMode::Remote;
        let store = Arc::new(MemoryArticleStore::new());
        let err = DedupService::from_config(&cfg, store).expect_err("invalid config");
        assert!(matches!(err, DetectError::InvalidConfig(_)));
    }
}
