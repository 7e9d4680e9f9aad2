//! Sliding window rate limiter.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::RateLimiter;

/// Sliding window: at most `limit` permits within any trailing interval
/// of `window` length.
///
/// Grant timestamps are kept in an ordered queue; entries older than the
/// window are purged on every acquisition attempt.
pub struct SlidingWindow {
    timestamps: Mutex<VecDeque<Instant>>,
    limit: usize,
    window: Duration,
}

impl SlidingWindow {
    /// Create a limiter granting at most `limit` permits per `window`.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is 0 or `window` is zero.
    pub fn new(limit: usize, window: Duration) -> Self {
        assert!(limit > 0, "window limit must be > 0");
        assert!(!window.is_zero(), "window size must be > 0");
        Self { timestamps: Mutex::new(VecDeque::with_capacity(limit)), limit, window }
    }

    fn purge(&self, timestamps: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = timestamps.front() {
            if oldest + self.window <= now {
                timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// Record a grant if the window has room, otherwise report how long
    /// until the oldest grant leaves the window.
    async fn try_record(&self) -> Result<(), Duration> {
        let mut timestamps = self.timestamps.lock().await;
        let now = Instant::now();
        self.purge(&mut timestamps, now);
        if timestamps.len() < self.limit {
            timestamps.push_back(now);
            return Ok(());
        }
        // front() is non-empty here: limit > 0 and the queue is full
        let oldest = *timestamps.front().unwrap();
        Err((oldest + self.window).duration_since(now))
    }
}

#[async_trait]
impl RateLimiter for SlidingWindow {
    async fn acquire(&self) {
        loop {
            match self.try_record().await {
                Ok(()) => return,
                Err(wait) => tokio::time::sleep(wait).await,
            }
        }
    }

    async fn try_acquire(&self) -> bool {
        self.try_record().await.is_ok()
    }
}
