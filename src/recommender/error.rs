use thiserror::Error;

/// Errors surfaced by the recommendation engine.
///
/// `SignalUnavailable` is internal in practice: entry points catch it and
/// degrade to popularity-only scoring instead of failing the request.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("user {0} has no listening history")]
    SignalUnavailable(usize),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Writing generated rows failed. Retryable; the computed scores are
    /// still handed back to the caller since reads never depend on writes.
    #[error("failed to persist recommendations: {0}")]
    PersistenceWrite(#[source] anyhow::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
