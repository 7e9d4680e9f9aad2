//! Throughput gating with interchangeable algorithms.
//!
//! Two algorithms behind one contract: a token bucket (bursts up to
//! capacity, sustained rate = refill rate) and a sliding window (hard
//! count bound over any trailing window). Both suspend waiters on the
//! tokio timer rather than spinning, and re-evaluate on wake so
//! contending waiters race for permits: best-effort fairness, no FIFO
//! guarantee, but no waiter starves while the configured rate is
//! positive.
//!
//! [`AdaptiveLimiter`] layers feedback on top of a token bucket,
//! throttling down on HTTP 429 responses.

pub mod adaptive;
pub mod sliding_window;
pub mod token_bucket;

use async_trait::async_trait;

pub use adaptive::AdaptiveLimiter;
pub use sliding_window::SlidingWindow;
pub use token_bucket::TokenBucket;

/// Shared contract for rate limiting algorithms.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Suspend until a permit is available, then consume it.
    ///
    /// Cancellation-safe: dropping the future before it resolves
    /// consumes nothing.
    async fn acquire(&self);

    /// Consume a permit if one is immediately available; never suspends.
    async fn try_acquire(&self) -> bool;
}
