//! On-disk cache backend: one serialized entry per file.
//!
//! Entries live under a configured directory, one file per key, named by
//! the SHA-256 hex digest of the key. Writes go to a temp file and are
//! renamed into place, so a crash leaves at most one partially-written
//! temp file and readers never observe a torn entry. Unreadable entries
//! are purged and reported as misses.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use super::{CacheStore, CachedResponse, normalize_ttl};
use crate::Error;

const ENTRY_EXT: &str = "json";
const TEMP_EXT: &str = "json.tmp";

#[derive(Debug, Serialize, Deserialize)]
struct DiskEntry {
    value: CachedResponse,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl DiskEntry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Bounded directory of serialized cache entries.
///
/// Capacity eviction removes the files with the oldest modification
/// time, which approximates least-recently-used by write order (reads do
/// not touch files).
pub struct DiskCache {
    dir: PathBuf,
    capacity: usize,
    // Serializes mutations so capacity eviction never races a write.
    lock: Mutex<()>,
}

impl DiskCache {
    /// Open (creating if needed) a disk cache rooted at `dir` holding at
    /// most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn open(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self, Error> {
        assert!(capacity > 0, "cache capacity must be > 0");
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, capacity, lock: Mutex::new(()) })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{digest}.{ENTRY_EXT}"))
    }

    async fn read_entry(path: &Path) -> Result<Option<DiskEntry>, Error> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entry = serde_json::from_slice(&bytes).map_err(|e| Error::Corrupt(e.to_string()))?;
        Ok(Some(entry))
    }

    async fn remove_quietly(path: &Path) {
        if let Err(e) = tokio::fs::remove_file(path).await
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove cache entry");
        }
    }

    /// List entry files with their modification times.
    async fn list_entries(&self) -> Result<Vec<(PathBuf, std::time::SystemTime)>, Error> {
        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXT) {
                continue;
            }
            let meta = item.metadata().await?;
            let mtime = meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH);
            entries.push((path, mtime));
        }
        Ok(entries)
    }

    /// Remove oldest-written entries until at most `capacity` remain.
    async fn enforce_capacity(&self) -> Result<(), Error> {
        let mut entries = self.list_entries().await?;
        if entries.len() <= self.capacity {
            return Ok(());
        }
        entries.sort_by_key(|(_, mtime)| *mtime);
        let excess = entries.len() - self.capacity;
        for (path, _) in entries.into_iter().take(excess) {
            tracing::debug!(path = %path.display(), "evicting oldest disk cache entry");
            Self::remove_quietly(&path).await;
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCache {
    async fn get(&self, key: &str) -> Option<CachedResponse> {
        let path = self.entry_path(key);
        let _guard = self.lock.lock().await;
        match Self::read_entry(&path).await {
            Ok(Some(entry)) if entry.is_expired(Utc::now()) => {
                Self::remove_quietly(&path).await;
                None
            }
            Ok(Some(entry)) => Some(entry.value),
            Ok(None) => None,
            Err(e) => {
                // Corrupt or unreadable entries are recovered locally:
                // purge and treat as a miss, never surface.
                tracing::warn!(key, error = %e, "purging unreadable cache entry");
                Self::remove_quietly(&path).await;
                None
            }
        }
    }

    async fn put(&self, key: &str, value: CachedResponse, ttl: Option<Duration>) -> Result<(), Error> {
        let created_at = Utc::now();
        let expires_at = normalize_ttl(ttl)
            .and_then(|t| chrono::Duration::from_std(t).ok())
            .map(|t| created_at + t);
        let entry = DiskEntry { value, created_at, expires_at };
        let bytes = serde_json::to_vec(&entry).map_err(|e| Error::Corrupt(e.to_string()))?;

        let path = self.entry_path(key);
        let tmp = path.with_extension(TEMP_EXT);

        let _guard = self.lock.lock().await;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        self.enforce_capacity().await
    }

    async fn delete(&self, key: &str) -> Result<(), Error> {
        let path = self.entry_path(key);
        let _guard = self.lock.lock().await;
        Self::remove_quietly(&path).await;
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let _guard = self.lock.lock().await;
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if ext == Some(ENTRY_EXT) || path.to_string_lossy().ends_with(TEMP_EXT) {
                Self::remove_quietly(&path).await;
            }
        }
        Ok(())
    }

    async fn contains(&self, key: &str) -> bool {
        let path = self.entry_path(key);
        matches!(Self::read_entry(&path).await, Ok(Some(entry)) if !entry.is_expired(Utc::now()))
    }

    async fn len(&self) -> usize {
        let Ok(entries) = self.list_entries().await else {
            return 0;
        };
        let now = Utc::now();
        let mut count = 0;
        for (path, _) in entries {
            if let Ok(Some(entry)) = Self::read_entry(&path).await
                && !entry.is_expired(now)
            {
                count += 1;
            }
        }
        count
    }
}
