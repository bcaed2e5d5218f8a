use thiserror::Error;

/// Typed error hierarchy for the suggestion service.
///
/// Use at module boundaries (gateway handlers, store, LLM delegate). Leaf
/// functions can keep returning `anyhow::Result` — the `Internal` variant
/// converts seamlessly via `?`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<u64> },

    #[error("external service failure: {message}")]
    ExternalServiceFailure { message: String, retryable: bool },

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("embedding failure: {0}")]
    EmbeddingFailure(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether the failing operation is worth retrying (used by the LLM
    /// delegate's backoff loop).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ExternalServiceFailure { retryable, .. } => *retryable,
            Self::RateLimited { .. } => true,
            _ => false,
        }
    }

    /// Whether this error should degrade silently (caller falls back to a
    /// coarser-but-correct result) rather than surface to the client.
    pub fn degrades(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ExternalServiceFailure { .. }
                | Self::StorageFailure(_)
                | Self::EmbeddingFailure(_)
        )
    }
}
