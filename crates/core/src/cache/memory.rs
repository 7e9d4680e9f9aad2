//! In-memory cache backend with LRU eviction.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::{CacheStore, CachedResponse, normalize_ttl};
use crate::Error;

struct Entry {
    value: CachedResponse,
    expires_at: Option<Instant>,
    last_access: u64,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

struct Inner {
    map: HashMap<String, Entry>,
    tick: u64,
}

/// Bounded in-memory cache.
///
/// Every `get` promotes the entry to most-recently-used; capacity
/// eviction removes the entry with the oldest access. Expiry uses the
/// tokio clock, so tests can drive it with a paused runtime.
pub struct MemoryCache {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl MemoryCache {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "cache capacity must be > 0");
        Self { inner: Mutex::new(Inner { map: HashMap::with_capacity(capacity), tick: 0 }), capacity }
    }

    fn evict_lru(inner: &mut Inner) {
        if let Some(victim) = inner
            .map
            .iter()
            .min_by_key(|(_, entry)| entry.last_access)
            .map(|(key, _)| key.clone())
        {
            tracing::debug!(key = %victim, "evicting least-recently-used cache entry");
            inner.map.remove(&victim);
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        let expired = inner.map.get(key).is_some_and(|entry| entry.is_expired(now));
        if expired {
            inner.map.remove(key);
            return None;
        }

        inner.tick += 1;
        let tick = inner.tick;
        let entry = inner.map.get_mut(key)?;
        entry.last_access = tick;
        Some(entry.value.clone())
    }

    async fn put(&self, key: &str, value: CachedResponse, ttl: Option<Duration>) -> Result<(), Error> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        if !inner.map.contains_key(key) && inner.map.len() >= self.capacity {
            Self::evict_lru(&mut inner);
        }

        inner.tick += 1;
        let entry = Entry {
            value,
            expires_at: normalize_ttl(ttl).map(|t| now + t),
            last_access: inner.tick,
        };
        inner.map.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        self.inner.lock().await.map.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        self.inner.lock().await.map.clear();
        Ok(())
    }

    async fn contains(&self, key: &str) -> bool {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        inner.map.get(key).is_some_and(|entry| !entry.is_expired(now))
    }

    async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        let now = Instant::now();
        inner.map.values().filter(|entry| !entry.is_expired(now)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(body: &str) -> CachedResponse {
        CachedResponse::ok(body)
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MemoryCache::new(10);
        cache.put("k", resp("v"), Some(Duration::from_secs(60))).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap().body, b"v");
    }

    #[tokio::test]
    async fn test_get_missing() {
        let cache = MemoryCache::new(10);
        assert!(cache.get("nope").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_absent() {
        let cache = MemoryCache::new(10);
        cache.put("k", resp("v"), Some(Duration::from_secs(1))).await.unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("k").await.is_none());
        // lazily purged
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_ttl_never_expires() {
        let cache = MemoryCache::new(10);
        cache.put("k", resp("v"), Some(Duration::ZERO)).await.unwrap();

        tokio::time::advance(Duration::from_secs(1_000_000)).await;
        assert!(cache.get("k").await.is_some());
    }

    #[tokio::test]
    async fn test_capacity_evicts_lru() {
        let cache = MemoryCache::new(2);
        cache.put("a", resp("a"), None).await.unwrap();
        cache.put("b", resp("b"), None).await.unwrap();

        // Access "a" to make it recently used.
        cache.get("a").await.unwrap();

        cache.put("c", resp("c"), None).await.unwrap();
        assert!(cache.get("a").await.is_some());
        assert!(cache.get("b").await.is_none());
        assert!(cache.get("c").await.is_some());
        assert_eq!(cache.len().await, 2);
    }

    #[tokio::test]
    async fn test_overwrite_does_not_evict() {
        let cache = MemoryCache::new(2);
        cache.put("a", resp("1"), None).await.unwrap();
        cache.put("b", resp("2"), None).await.unwrap();
        cache.put("a", resp("3"), None).await.unwrap();

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await.unwrap().body, b"3");
        assert!(cache.get("b").await.is_some());
    }

    #[tokio::test]
    async fn test_many_puts_keep_capacity_entries() {
        let cache = MemoryCache::new(3);
        for i in 0..10 {
            cache.put(&format!("k{i}"), resp("v"), None).await.unwrap();
        }
        assert_eq!(cache.len().await, 3);
        // the three most recent keys survive
        for i in 7..10 {
            assert!(cache.get(&format!("k{i}")).await.is_some());
        }
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let cache = MemoryCache::new(10);
        cache.put("a", resp("a"), None).await.unwrap();
        cache.put("b", resp("b"), None).await.unwrap();

        cache.delete("a").await.unwrap();
        assert!(cache.get("a").await.is_none());
        // deleting again is a no-op
        cache.delete("a").await.unwrap();

        cache.clear().await.unwrap();
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_contains_does_not_promote() {
        let cache = MemoryCache::new(2);
        cache.put("a", resp("a"), None).await.unwrap();
        cache.put("b", resp("b"), None).await.unwrap();

        // contains() must not count as an access, so "a" stays LRU.
        assert!(cache.contains("a").await);

        cache.put("c", resp("c"), None).await.unwrap();
        assert!(!cache.contains("a").await);
        assert!(cache.contains("b").await);
    }

    #[tokio::test]
    async fn test_shared_across_tasks() {
        use std::sync::Arc;

        let cache = Arc::new(MemoryCache::new(100));
        let mut handles = Vec::new();
        for i in 0..8 {
            let cache = Arc::clone(&cache);
            handles.push(tokio::spawn(async move {
                let key = format!("k{i}");
                cache.put(&key, CachedResponse::ok("v"), None).await.unwrap();
                assert!(cache.get(&key).await.is_some());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(cache.len().await, 8);
    }
}
