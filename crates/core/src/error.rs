//! Unified error types for kerb-core.

use crate::config::ConfigError;

/// Unified error types for cache and configuration operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Cache backend I/O failed.
    #[error("CACHE_IO: {0}")]
    Io(#[from] std::io::Error),

    /// A stored cache entry could not be decoded.
    ///
    /// Always recovered internally: the entry is purged and the lookup
    /// behaves as a miss. Exposed so backends can classify the failure.
    #[error("CACHE_CORRUPT: {0}")]
    Corrupt(String),

    /// Configuration loading or validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
