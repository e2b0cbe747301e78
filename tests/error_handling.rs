//! Failure-path tests: provider outages and timeouts, dimension mismatches,
//! threshold boundaries, and configuration validation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hedex::{
    ArticleRecord, ArticleStatus, Classification, DedupService, DetectError, DetectorConfig,
    EmbedError, EmbeddingProvider, HedexConfig, MemoryArticleStore,
};

struct DownProvider;

#[async_trait]
impl EmbeddingProvider for DownProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unavailable("connection refused".into()))
    }
}

struct HangingProvider;

#[async_trait]
impl EmbeddingProvider for HangingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(vec![1.0])
    }
}

struct FixedProvider(Vec<f32>);

#[async_trait]
impl EmbeddingProvider for FixedProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Ok(self.0.clone())
    }
}

fn service(provider: Arc<dyn EmbeddingProvider>, detector: DetectorConfig) -> DedupService {
    DedupService::new(provider, Arc::new(MemoryArticleStore::new()), detector)
        .expect("service builds")
}

#[tokio::test]
async fn provider_outage_aborts_classification() {
    let service = service(Arc::new(DownProvider), DetectorConfig::default());
    let err = service
        .classifier
        .classify("candidate text")
        .await
        .expect_err("provider is down");
    assert!(matches!(err, DetectError::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn provider_timeout_aborts_classification_without_hanging() {
    let detector = DetectorConfig {
        embed_timeout_ms: 50,
        ..Default::default()
    };
    let service = service(Arc::new(HangingProvider), detector);
    let err = service
        .classifier
        .classify("candidate text")
        .await
        .expect_err("deadline must elapse");
    assert!(matches!(err, DetectError::EmbeddingUnavailable(_)));
}

#[tokio::test]
async fn publish_with_failing_provider_leaves_no_partial_state() {
    let service = service(Arc::new(DownProvider), DetectorConfig::default());
    let article =
        ArticleRecord::new("art-1", "Title", "Body").with_status(ArticleStatus::Approved);
    let err = service
        .coordinator
        .on_publish(&article)
        .await
        .expect_err("embedding fails");
    assert!(matches!(err, DetectError::EmbeddingUnavailable(_)));
    assert!(service.index.is_empty());
}

#[tokio::test]
async fn dimension_change_is_surfaced_not_coerced() {
    let service = service(
        Arc::new(FixedProvider(vec![1.0, 0.0])),
        DetectorConfig::default(),
    );
    let first = ArticleRecord::new("art-1", "Title", "Body")
        .with_status(ArticleStatus::Approved)
        .with_embedding(vec![1.0, 0.0, 0.0]);
    service.coordinator.on_publish(&first).await.unwrap();

    // Provider now returns 2-dimensional vectors against a 3-dimensional
    // index: both publish and classify must fail loudly.
    let second =
        ArticleRecord::new("art-2", "Title", "Body two").with_status(ArticleStatus::Approved);
    let err = service
        .coordinator
        .on_publish(&second)
        .await
        .expect_err("dimension mismatch");
    assert!(matches!(err, DetectError::Index(_)));

    let err = service
        .classifier
        .classify("candidate")
        .await
        .expect_err("dimension mismatch");
    assert!(matches!(err, DetectError::Index(_)));
}

#[tokio::test]
async fn score_exactly_at_threshold_is_duplicate() {
    let boundary = 24.0f32 / 25.0f32;
    let detector = DetectorConfig {
        similarity_threshold: boundary,
        ..Default::default()
    };
    let service = service(Arc::new(FixedProvider(vec![3.0, 4.0])), detector);

    let stored = ArticleRecord::new("art-1", "Title", "Body")
        .with_status(ArticleStatus::Approved)
        .with_embedding(vec![4.0, 3.0]);
    service.coordinator.on_publish(&stored).await.unwrap();

    let result = service.classifier.classify("candidate").await.unwrap();
    assert_eq!(result.score, boundary);
    assert_eq!(result.classification, Classification::Duplicate);
}

#[tokio::test]
async fn score_just_below_threshold_is_unique() {
    let detector = DetectorConfig {
        similarity_threshold: 0.97,
        ..Default::default()
    };
    let service = service(Arc::new(FixedProvider(vec![3.0, 4.0])), detector);

    let stored = ArticleRecord::new("art-1", "Title", "Body")
        .with_status(ArticleStatus::Approved)
        .with_embedding(vec![4.0, 3.0]);
    service.coordinator.on_publish(&stored).await.unwrap();

    let result = service.classifier.classify("candidate").await.unwrap();
    assert!(result.score < 0.97);
    assert_eq!(result.classification, Classification::Unique);
    assert_eq!(result.matched_article_id, None);
}

#[test]
fn config_rejects_bad_values() {
    let yaml = "version: \"3\"\n";
    assert!(HedexConfig::from_yaml(yaml).is_err());

    let yaml = "version: \"1.0\"\ndetector:\n  similarity_threshold: -0.2\n";
    assert!(HedexConfig::from_yaml(yaml).is_err());

    let yaml = "version: \"1.0\"\ndetector:\n  embed_timeout_ms: 0\n";
    assert!(HedexConfig::from_yaml(yaml).is_err());
}

#[test]
fn config_loads_from_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(
        file,
        "version: \"1.0\"\ndetector:\n  similarity_threshold: 0.9\n"
    )
    .expect("write config");

    let cfg = HedexConfig::from_file(file.path()).expect("config loads");
    assert_eq!(cfg.detector.similarity_threshold, 0.9);

    let missing = HedexConfig::from_file("/nonexistent/hedex.yaml");
    assert!(missing.is_err());
}

#[tokio::test]
async fn empty_candidate_is_an_error_not_unique() {
    let service = service(
        Arc::new(FixedProvider(vec![1.0, 0.0])),
        DetectorConfig::default(),
    );
    let err = service
        .classifier
        .classify("   \n\t")
        .await
        .expect_err("blank candidate rejected");
    assert!(matches!(err, DetectError::Article(_)));
}
