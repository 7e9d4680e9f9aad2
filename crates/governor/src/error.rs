//! Error types for the governance pipeline.

use std::time::Duration;

/// Opaque transport error supplied by the caller's closure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures surfaced by [`crate::Governor::execute`].
///
/// Every variant is scoped to the single call that raised it; nothing
/// here is fatal to the process. Cache corruption never appears: it is
/// recovered inside the cache backend and treated as a miss.
#[derive(Debug, thiserror::Error)]
pub enum GovernorError {
    /// The transport failed with an error classified non-retryable.
    #[error("TRANSPORT: {0}")]
    Transport(#[source] BoxError),

    /// Every permitted attempt failed; wraps the last transport error.
    #[error("RETRIES_EXHAUSTED: {attempts} attempts failed: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: BoxError,
    },

    /// Rate limiter acquisition exceeded the caller-imposed deadline.
    #[error("LIMITER_TIMEOUT: no permit within {0:?}")]
    LimiterTimeout(Duration),

    /// The caller aborted a suspended wait.
    #[error("CANCELLED: request cancelled")]
    Cancelled,
}
