use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use crate::article::{ArticleRecord, ArticleStatus};

/// Errors from the backing article store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached. Startup rebuild fails outright on
    /// this, since the store is the source of truth.
    #[error("article store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only view of the durable article store.
///
/// The core never writes article documents or status transitions; those
/// belong to the surrounding review workflow.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// All records currently in a published status, with whatever embeddings
    /// they carry.
    async fn list_published(&self) -> Result<Vec<ArticleRecord>, StoreError>;

    /// Fetch a single record by id.
    async fn get(&self, article_id: &str) -> Result<Option<ArticleRecord>, StoreError>;
}

/// In-memory store for tests and demos.
#[derive(Default)]
pub struct MemoryArticleStore {
    records: RwLock<HashMap<String, ArticleRecord>>,
}

impl MemoryArticleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, record: ArticleRecord) {
        self.write().insert(record.id.clone(), record);
    }

    pub fn remove(&self, article_id: &str) {
        self.write().remove(article_id);
    }

    pub fn set_status(&self, article_id: &str, status: ArticleStatus) {
        if let Some(record) = self.write().get_mut(article_id) {
            record.status = status;
        }
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ArticleRecord>> {
        self.records
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ArticleRecord>> {
        self.records
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    async fn list_published(&self) -> Result<Vec<ArticleRecord>, StoreError> {
        let mut published: Vec<ArticleRecord> = self
            .read()
            .values()
            .filter(|r| r.status.is_published())
            .cloned()
            .collect();
        // Deterministic enumeration order for rebuilds.
        published.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(published)
    }

    async fn get(&self, article_id: &str) -> Result<Option<ArticleRecord>, StoreError> {
        Ok(self.read().get(article_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn list_published_filters_statuses() {
        let store = MemoryArticleStore::new();
        store.put(
            ArticleRecord::new("a", "A", "content a").with_status(ArticleStatus::Approved),
        );
        store.put(
            ArticleRecord::new("b", "B", "content b").with_status(ArticleStatus::Uploaded),
        );
        store.put(ArticleRecord::new("c", "C", "content c").with_status(ArticleStatus::Draft));
        store.put(
            ArticleRecord::new("d", "D", "content d").with_status(ArticleStatus::Rejected),
        );

        let published = store.list_published().await.unwrap();
        let ids: Vec<&str> = published.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(published.len(), 2);
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"b"));
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_id() {
        let store = MemoryArticleStore::new();
        assert_eq!(store.get("ghost").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_status_updates_record() {
        let store = MemoryArticleStore::new();
        store.put(ArticleRecord::new("a", "A", "content"));
        store.set_status("a", ArticleStatus::Approved);
        let record = store.get("a").await.unwrap().unwrap();
        assert_eq!(record.status, ArticleStatus::Approved);
    }
}
