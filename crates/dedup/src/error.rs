use thiserror::Error;

use crate::article::ArticleError;
use crate::store::StoreError;
use embedding::EmbedError;
use index::IndexError;

/// Errors produced by classification and index-lifecycle coordination.
///
/// These are returned to the caller as typed failures and never swallowed;
/// in particular a provider failure is never reported as "unique".
#[derive(Debug, Error)]
pub enum DetectError {
    /// The embedding provider failed or timed out. No index mutation was
    /// attempted.
    #[error("embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedError),
    /// Index-level failure, e.g. a vector of the wrong dimensionality.
    #[error("index error: {0}")]
    Index(#[from] IndexError),
    /// The article store could not be read.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// An article record failed boundary validation.
    #[error("invalid article: {0}")]
    Article(#[from] ArticleError),
    /// Detector configuration is out of range.
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
}
