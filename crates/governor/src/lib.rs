//! Request governance pipeline for well-behaved scrapers.
//!
//! Composes three independent components around each outbound request:
//!
//! - [`retry::RetryPolicy`]: exponential backoff with optional jitter
//! - [`limit::RateLimiter`]: token bucket or sliding window throughput gate
//! - a [`kerb_core::CacheStore`] backend consulted before any network cost
//!
//! [`governor::Governor`] wires them together: cache hit short-circuits,
//! otherwise a limiter permit is acquired and the caller-supplied
//! transport closure is invoked under the retry policy.

pub mod error;
pub mod governor;
pub mod limit;
pub mod retry;

pub use error::{BoxError, GovernorError};
pub use governor::{ExecuteOptions, Governor};
pub use limit::{AdaptiveLimiter, RateLimiter, SlidingWindow, TokenBucket};
pub use retry::RetryPolicy;
