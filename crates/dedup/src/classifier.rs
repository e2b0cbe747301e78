use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use embedding::{embed_with_timeout, EmbeddingProvider};
use index::VectorIndex;

use crate::error::DetectError;

/// Verdict on a candidate article.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Unique,
    Duplicate,
}

/// Result of a duplicate check.
///
/// Advisory only: the review workflow decides whether to skip, edit, or
/// force-store a flagged candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimilarityResult {
    /// Closest published article, populated when the candidate clears the
    /// threshold.
    pub matched_article_id: Option<String>,
    /// Cosine similarity of the nearest neighbor in [0.0, 1.0]; 0.0 against
    /// an empty index. Deterministic for identical inputs.
    pub score: f32,
    pub classification: Classification,
}

/// Tuning knobs for duplicate classification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    /// Similarity at or above this value classifies as duplicate. The
    /// comparison is inclusive at the boundary.
    #[serde(default = "DetectorConfig::default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Deadline for a single embedding call, in milliseconds.
    #[serde(default = "DetectorConfig::default_embed_timeout_ms")]
    pub embed_timeout_ms: u64,
}

impl DetectorConfig {
    pub(crate) fn default_similarity_threshold() -> f32 {
        0.85
    }

    pub(crate) fn default_embed_timeout_ms() -> u64 {
        10_000
    }

    pub fn embed_timeout(&self) -> Duration {
        Duration::from_millis(self.embed_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), DetectError> {
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(DetectError::InvalidConfig(format!(
                "similarity_threshold must be within [0.0, 1.0], got {}",
                self.similarity_threshold
            )));
        }
        if self.embed_timeout_ms == 0 {
            return Err(DetectError::InvalidConfig(
                "embed_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: Self::default_similarity_threshold(),
            embed_timeout_ms: Self::default_embed_timeout_ms(),
        }
    }
}

/// Classifies candidate articles against the published set.
pub struct DuplicateClassifier {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    cfg: DetectorConfig,
}

impl DuplicateClassifier {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        cfg: DetectorConfig,
    ) -> Result<Self, DetectError> {
        cfg.validate()?;
        Ok(Self {
            provider,
            index,
            cfg,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    /// Check one candidate text against the index.
    ///
    /// Embedding failure or timeout aborts with
    /// [`DetectError::EmbeddingUnavailable`]; it is never reported as
    /// unique. An empty index classifies as unique with score 0.0. For a
    /// fixed index state and candidate vector the result is identical on
    /// every call.
    pub async fn classify(&self, candidate_text: &str) -> Result<SimilarityResult, DetectError> {
        let text = candidate_text.trim();
        if text.is_empty() {
            return Err(crate::article::ArticleError::EmptyCandidate.into());
        }

        let vector =
            embed_with_timeout(self.provider.as_ref(), text, self.cfg.embed_timeout()).await?;
        let hits = self.index.search(&vector, 1)?;

        let result = match hits.into_iter().next() {
            None => SimilarityResult {
                matched_article_id: None,
                score: 0.0,
                classification: Classification::Unique,
            },
            Some(hit) => {
                if hit.score >= self.cfg.similarity_threshold {
                    SimilarityResult {
                        matched_article_id: Some(hit.article_id),
                        score: hit.score,
                        classification: Classification::Duplicate,
                    }
                } else {
                    SimilarityResult {
                        matched_article_id: None,
                        score: hit.score,
                        classification: Classification::Unique,
                    }
                }
            }
        };

        tracing::debug!(
            score = result.score,
            classification = ?result.classification,
            matched = result.matched_article_id.as_deref().unwrap_or("-"),
            "candidate classified"
        );
        Ok(result)
    }

    /// Classify several candidates sequentially, reporting each outcome.
    pub async fn classify_batch(
        &self,
        candidates: &[String],
    ) -> Vec<Result<SimilarityResult, DetectError>> {
        let mut results = Vec::with_capacity(candidates.len());
        for text in candidates {
            results.push(self.classify(text).await);
        }
        results
    }
}

/// Human-readable banding of a similarity score, for reviewer-facing output.
pub fn similarity_explanation(score: f32) -> &'static str {
    if score >= 0.9 {
        "Very high similarity - likely duplicate"
    } else if score >= 0.8 {
        "High similarity - possible duplicate"
    } else if score >= 0.7 {
        "Moderate similarity - review recommended"
    } else if score >= 0.5 {
        "Some similarity - minor overlap"
    } else {
        "Low similarity - likely unique content"
    }
}
