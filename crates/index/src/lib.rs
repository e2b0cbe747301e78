//! # Similarity index (`index`)
//!
//! This crate holds the embeddings of every published article as id+vector
//! pairs and answers k-nearest-neighbor queries by cosine similarity. It is
//! derived state: the article store is the source of truth and the whole
//! index can be rebuilt from it at any time, so nothing here touches disk.
//!
//! ## Key behaviors
//!
//! - [`VectorIndex::insert`] is idempotent: re-inserting an id overwrites the
//!   prior vector in place, which also keeps its tie-break position stable
//!   across re-embeds.
//! - [`VectorIndex::search`] orders hits by descending similarity; equal
//!   scores are broken by insertion order, earliest first, so results are
//!   deterministic.
//! - [`VectorIndex::rebuild`] replaces the full contents atomically: a
//!   concurrent reader sees either the old set or the new set, never a mix.
//!   Malformed entries are skipped with a warning rather than failing the
//!   whole rebuild.
//! - Dimensionality is fixed by the first inserted vector (or the first
//!   valid rebuild entry) and enforced on every subsequent insert and query.
//!
//! The scan is a brute-force cosine pass over an insertion-ordered `Vec`.
//! Callers only depend on the contract, so a smarter structure can replace
//! the scan without touching them.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One indexed article: back-reference plus the embedding at insertion time.
/// The index never owns article content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    pub article_id: String,
    pub vector: Vec<f32>,
}

impl IndexEntry {
    pub fn new(article_id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self {
            article_id: article_id.into(),
            vector,
        }
    }
}

/// A single search result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub article_id: String,
    /// Cosine similarity clamped to [0.0, 1.0].
    pub score: f32,
}

/// What a rebuild actually loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Entries now present in the index.
    pub loaded: usize,
    /// Entries rejected during input validation.
    pub skipped: usize,
}

/// Errors produced by the index.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// Vector length disagrees with the dimensionality fixed at first
    /// insert or rebuild. Never coerced by truncation or padding.
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    /// Zero-length vectors carry no direction and are rejected outright.
    #[error("empty vector rejected")]
    EmptyVector,
}

struct Inner {
    /// Fixed by the first insert or rebuild; `None` only while empty since
    /// startup or the last rebuild.
    dim: Option<usize>,
    /// Insertion-ordered. Position is the tie-break rank.
    entries: Vec<IndexEntry>,
    /// article_id -> position in `entries`.
    slots: hashbrown::HashMap<String, usize>,
}

impl Inner {
    fn empty() -> Self {
        Self {
            dim: None,
            entries: Vec::new(),
            slots: hashbrown::HashMap::new(),
        }
    }
}

/// Process-wide similarity index over published article embeddings.
///
/// Reads run concurrently with each other; every insert/remove/rebuild is
/// exclusive, so a search observes only fully-applied mutations.
pub struct VectorIndex {
    inner: RwLock<Inner>,
}

impl VectorIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::empty()),
        }
    }

    /// Add or overwrite the entry for `article_id`.
    ///
    /// Overwriting keeps the entry's original position so tie-break order is
    /// unaffected by re-embedding after a content edit.
    pub fn insert(&self, article_id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        if vector.is_empty() {
            return Err(IndexError::EmptyVector);
        }
        let mut inner = self.write();
        if let Some(dim) = inner.dim {
            if vector.len() != dim {
                return Err(IndexError::DimensionMismatch {
                    expected: dim,
                    actual: vector.len(),
                });
            }
        } else {
            inner.dim = Some(vector.len());
        }

        match inner.slots.get(article_id).copied() {
            Some(pos) => inner.entries[pos].vector = vector,
            None => {
                let pos = inner.entries.len();
                inner.entries.push(IndexEntry::new(article_id, vector));
                inner.slots.insert(article_id.to_string(), pos);
            }
        }
        Ok(())
    }

    /// Delete the entry for `article_id`; no-op if absent.
    ///
    /// Dimensionality stays pinned until the next rebuild even when the last
    /// entry goes away.
    pub fn remove(&self, article_id: &str) {
        let mut inner = self.write();
        if let Some(pos) = inner.slots.remove(article_id) {
            inner.entries.remove(pos);
            let shifted: Vec<String> = inner.entries[pos..]
                .iter()
                .map(|e| e.article_id.clone())
                .collect();
            for id in shifted {
                if let Some(slot) = inner.slots.get_mut(&id) {
                    *slot -= 1;
                }
            }
        }
    }

    /// Return up to `k` entries ordered by descending cosine similarity.
    ///
    /// Ties are broken by insertion order, earliest first. An empty index
    /// yields an empty result for any query; a non-empty index rejects
    /// queries of the wrong dimension.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        let inner = self.read();
        if inner.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let dim = inner.dim.unwrap_or(0);
        if query.len() != dim {
            return Err(IndexError::DimensionMismatch {
                expected: dim,
                actual: query.len(),
            });
        }

        let mut hits: Vec<SearchHit> = inner
            .entries
            .iter()
            .map(|entry| SearchHit {
                article_id: entry.article_id.clone(),
                score: cosine_similarity(query, &entry.vector),
            })
            .collect();

        // Stable sort over the insertion-ordered list: equal scores keep
        // earliest-inserted first.
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    /// Atomically replace the entire index contents.
    ///
    /// The replacement is staged off to the side and swapped in under the
    /// write lock, so concurrent readers see the old set right up until they
    /// see the complete new one. Input validation is per entry: empty,
    /// non-finite, or dimension-mismatched vectors are logged and skipped
    /// without failing the rest.
    pub fn rebuild(&self, entries: Vec<IndexEntry>) -> RebuildOutcome {
        let mut staged = Inner::empty();
        let mut skipped = 0usize;

        for entry in entries {
            if let Some(reason) = malformed_reason(&staged, &entry.vector) {
                tracing::warn!(
                    article_id = %entry.article_id,
                    reason,
                    "skipping corrupt entry during index rebuild"
                );
                skipped += 1;
                continue;
            }
            if staged.dim.is_none() {
                staged.dim = Some(entry.vector.len());
            }
            match staged.slots.get(&entry.article_id).copied() {
                Some(pos) => staged.entries[pos].vector = entry.vector,
                None => {
                    let pos = staged.entries.len();
                    staged.slots.insert(entry.article_id.clone(), pos);
                    staged.entries.push(entry);
                }
            }
        }

        let loaded = staged.entries.len();
        *self.write() = staged;
        RebuildOutcome { loaded, skipped }
    }

    /// Number of indexed articles.
    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().entries.is_empty()
    }

    /// Dimensionality fixed at first insert/rebuild, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.read().dim
    }

    pub fn contains(&self, article_id: &str) -> bool {
        self.read().slots.contains_key(article_id)
    }

    /// Ids currently present, in insertion order.
    pub fn article_ids(&self) -> Vec<String> {
        self.read()
            .entries
            .iter()
            .map(|e| e.article_id.clone())
            .collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for VectorIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn malformed_reason(staged: &Inner, vector: &[f32]) -> Option<&'static str> {
    if vector.is_empty() {
        return Some("empty vector");
    }
    if !vector.iter().all(|v| v.is_finite()) {
        return Some("non-finite component");
    }
    if let Some(dim) = staged.dim {
        if vector.len() != dim {
            return Some("dimension mismatch");
        }
    }
    None
}

/// Cosine similarity between two equal-length vectors, clamped to [0.0, 1.0].
/// Embedding magnitude carries no meaning for semantic closeness, only
/// direction, so the dot product is normalized by both norms.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}
