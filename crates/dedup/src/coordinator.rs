use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use embedding::{embed_with_timeout, EmbeddingProvider};
use index::{IndexEntry, VectorIndex};

use crate::article::ArticleRecord;
use crate::classifier::DetectorConfig;
use crate::error::DetectError;
use crate::store::ArticleStore;

/// What a startup rebuild accomplished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    /// Articles now present in the index.
    pub indexed: usize,
    /// Articles left out (failed embedding or malformed stored vector).
    pub skipped: usize,
    /// Articles whose missing embedding was recomputed via the provider.
    pub recomputed: usize,
}

/// Keeps the similarity index synchronized with article lifecycle
/// transitions.
///
/// All index mutations funnel through one async mutex so insert, remove,
/// and rebuild form a single serializable sequence. Classifier searches run
/// concurrently; the index's own lock keeps each mutation atomic from a
/// reader's point of view.
pub struct ConsistencyCoordinator {
    provider: Arc<dyn EmbeddingProvider>,
    index: Arc<VectorIndex>,
    store: Arc<dyn ArticleStore>,
    embed_timeout: Duration,
    write_gate: Mutex<()>,
}

impl ConsistencyCoordinator {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        index: Arc<VectorIndex>,
        store: Arc<dyn ArticleStore>,
        cfg: &DetectorConfig,
    ) -> Self {
        Self {
            provider,
            index,
            store,
            embed_timeout: cfg.embed_timeout(),
            write_gate: Mutex::new(()),
        }
    }

    /// Index an article that just entered a published status.
    ///
    /// Reuses the stored embedding when one exists, otherwise computes it;
    /// an embedding failure fails the publish as a whole and leaves the
    /// index untouched. Returns the vector so the surrounding workflow can
    /// persist it alongside the article record. Re-publishing an
    /// already-indexed id overwrites its vector without any duplicate check
    /// against itself.
    pub async fn on_publish(&self, article: &ArticleRecord) -> Result<Vec<f32>, DetectError> {
        article.require_published()?;

        let vector = match article.embedding.as_ref().filter(|v| !v.is_empty()) {
            Some(existing) => existing.clone(),
            None => {
                embed_with_timeout(
                    self.provider.as_ref(),
                    &article.content_text,
                    self.embed_timeout,
                )
                .await?
            }
        };

        let _gate = self.write_gate.lock().await;
        self.index.insert(&article.id, vector.clone())?;
        tracing::info!(article_id = %article.id, "article indexed for similarity search");
        Ok(vector)
    }

    /// Drop an article that was deleted or demoted out of the published
    /// set. Safe to call any number of times.
    pub async fn on_unpublish_or_delete(&self, article_id: &str) {
        let _gate = self.write_gate.lock().await;
        self.index.remove(article_id);
        tracing::info!(article_id, "article removed from similarity index");
    }

    /// Rebuild the index from the store's published set.
    ///
    /// This is the recovery path after a crash or cold start. The store
    /// being unreachable fails the whole startup; a single article whose
    /// embedding cannot be computed is skipped with a warning so it never
    /// blocks the rest.
    pub async fn on_startup(&self) -> Result<RebuildReport, DetectError> {
        let published = self.store.list_published().await?;

        let mut entries = Vec::with_capacity(published.len());
        let mut recomputed = 0usize;
        let mut embed_failures = 0usize;

        for article in published {
            if let Err(err) = article.require_published() {
                tracing::warn!(article_id = %article.id, error = %err, "skipping article during rebuild");
                embed_failures += 1;
                continue;
            }
            let vector = match article.embedding.as_ref().filter(|v| !v.is_empty()) {
                Some(existing) => existing.clone(),
                None => {
                    match embed_with_timeout(
                        self.provider.as_ref(),
                        &article.content_text,
                        self.embed_timeout,
                    )
                    .await
                    {
                        Ok(vector) => {
                            recomputed += 1;
                            vector
                        }
                        Err(err) => {
                            tracing::warn!(
                                article_id = %article.id,
                                error = %err,
                                "could not recompute embedding during rebuild"
                            );
                            embed_failures += 1;
                            continue;
                        }
                    }
                }
            };
            entries.push(IndexEntry::new(article.id, vector));
        }

        let _gate = self.write_gate.lock().await;
        let outcome = self.index.rebuild(entries);
        let report = RebuildReport {
            indexed: outcome.loaded,
            skipped: outcome.skipped + embed_failures,
            recomputed,
        };
        tracing::info!(
            indexed = report.indexed,
            skipped = report.skipped,
            recomputed = report.recomputed,
            "similarity index rebuilt from article store"
        );
        Ok(report)
    }
}
