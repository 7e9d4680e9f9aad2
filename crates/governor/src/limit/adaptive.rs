//! Feedback-driven rate limiter.
//!
//! Wraps a token bucket and adjusts its sustained rate from response
//! status codes: HTTP 429 halves the rate, success nudges it back up.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{RateLimiter, TokenBucket};

const BACKOFF_FACTOR: f64 = 0.5;
const RECOVERY_FACTOR: f64 = 1.1;

struct AdaptiveState {
    rps: f64,
    bucket: Arc<TokenBucket>,
}

/// Token bucket whose rate adapts to server feedback.
///
/// The bucket is rebuilt on each adjustment with a burst capacity of
/// twice the current rate, so a throttled-down limiter also loses its
/// burst allowance.
pub struct AdaptiveLimiter {
    state: RwLock<AdaptiveState>,
    min_rps: f64,
    max_rps: f64,
}

impl AdaptiveLimiter {
    /// Create an adaptive limiter starting at `initial_rps`, clamped to
    /// `[min_rps, max_rps]` as feedback arrives.
    ///
    /// # Panics
    ///
    /// Panics if `min_rps` is not positive or the bounds are inverted.
    pub fn new(initial_rps: f64, min_rps: f64, max_rps: f64) -> Self {
        assert!(min_rps > 0.0, "min_rps must be > 0");
        assert!(min_rps <= max_rps, "min_rps must not exceed max_rps");
        let rps = initial_rps.clamp(min_rps, max_rps);
        Self {
            state: RwLock::new(AdaptiveState { rps, bucket: Arc::new(Self::bucket_for(rps)) }),
            min_rps,
            max_rps,
        }
    }

    fn bucket_for(rps: f64) -> TokenBucket {
        let capacity = (rps * 2.0).ceil().max(1.0) as u32;
        TokenBucket::new(rps, capacity)
    }

    /// Current sustained rate in requests per second.
    pub async fn current_rps(&self) -> f64 {
        self.state.read().await.rps
    }

    /// Feed back a response status code.
    ///
    /// 429 halves the rate (floored at `min_rps`); any non-error status
    /// raises it by 10% (capped at `max_rps`).
    pub async fn report_response(&self, status: u16) {
        let mut state = self.state.write().await;
        let new_rps = match status {
            429 => {
                let reduced = (state.rps * BACKOFF_FACTOR).max(self.min_rps);
                tracing::warn!(old_rps = state.rps, new_rps = reduced, "rate limited by server, throttling down");
                reduced
            }
            s if s < 400 => (state.rps * RECOVERY_FACTOR).min(self.max_rps),
            _ => return,
        };
        if new_rps != state.rps {
            state.rps = new_rps;
            state.bucket = Arc::new(Self::bucket_for(new_rps));
        }
    }

    async fn bucket(&self) -> Arc<TokenBucket> {
        Arc::clone(&self.state.read().await.bucket)
    }
}

#[async_trait]
impl RateLimiter for AdaptiveLimiter {
    async fn acquire(&self) {
        // Snapshot the bucket so a concurrent rate change never blocks
        // behind a sleeping waiter; the new rate applies from the next
        // acquisition.
        let bucket = self.bucket().await;
        bucket.acquire().await;
    }

    async fn try_acquire(&self) -> bool {
        let bucket = self.bucket().await;
        bucket.try_acquire().await
    }
}
