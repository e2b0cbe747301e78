use thiserror::Error;

/// Errors surfaced by embedding providers.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EmbedError {
    /// Configuration is inconsistent (e.g., remote mode without an API URL).
    #[error("invalid embedding config: {0}")]
    InvalidConfig(String),
    /// The provider failed or the caller-supplied deadline elapsed.
    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),
    /// The provider answered but the response could not be interpreted.
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}
