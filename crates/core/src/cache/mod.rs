//! Response cache with interchangeable backends.
//!
//! Both backends share one async contract:
//!
//! - **memory**: bounded map with true LRU eviction, expiry tracked on a
//!   tokio clock so it can be tested under a paused runtime
//! - **disk**: bounded directory of serialized entries, one file per key,
//!   written atomically via temp-file-then-rename
//!
//! An entry whose expiry has passed is logically absent: it is never
//! returned and is lazily purged on lookup. All operations are internally
//! synchronized; callers never need their own locking.

pub mod disk;
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

pub use disk::DiskCache;
pub use memory::MemoryCache;

/// The opaque value stored per cache key: a response body plus the
/// metadata needed to replay it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Convenience constructor for a bare 200 response.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self { status: 200, headers: Vec::new(), body: body.into() }
    }
}

/// Shared contract for cache backends.
///
/// `ttl` of `None` means the entry never expires until evicted by
/// capacity. A `ttl` of zero is normalized to the same meaning.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Look up a fresh entry. Expired entries are purged and reported
    /// as absent.
    async fn get(&self, key: &str) -> Option<CachedResponse>;

    /// Insert or overwrite an entry. Evicts the least-recently-used
    /// entry first when the store is at capacity and the key is new.
    async fn put(&self, key: &str, value: CachedResponse, ttl: Option<Duration>) -> Result<(), Error>;

    /// Remove an entry if present; no-op otherwise.
    async fn delete(&self, key: &str) -> Result<(), Error>;

    /// Remove all entries.
    async fn clear(&self) -> Result<(), Error>;

    /// Whether a fresh entry exists for the key, without counting as an
    /// access for eviction purposes.
    async fn contains(&self, key: &str) -> bool;

    /// Number of non-expired entries currently stored.
    async fn len(&self) -> usize;
}

pub(crate) fn normalize_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|t| !t.is_zero())
}
