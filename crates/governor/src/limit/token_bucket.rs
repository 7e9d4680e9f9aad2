//! Token bucket rate limiter.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::RateLimiter;

// Refill arithmetic is floating point; without a little slack a waiter
// that slept exactly the computed deficit can wake to 0.9999... tokens
// and sleep again for nanoseconds.
const TOKEN_SLACK: f64 = 1e-9;

struct State {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket: capacity accrues at `rate` tokens per second up to a
/// burst ceiling, and each permit consumes one token.
///
/// Starts full, so a fresh limiter allows an initial burst of
/// `capacity` permits.
pub struct TokenBucket {
    state: Mutex<State>,
    capacity: f64,
    rate: f64,
}

impl TokenBucket {
    /// Create a bucket refilling at `rate` tokens per second, holding at
    /// most `capacity` tokens.
    ///
    /// # Panics
    ///
    /// Panics if `rate` is not positive and finite, or `capacity` is 0.
    pub fn new(rate: f64, capacity: u32) -> Self {
        assert!(rate.is_finite() && rate > 0.0, "refill rate must be > 0");
        assert!(capacity > 0, "bucket capacity must be > 0");
        Self {
            state: Mutex::new(State { tokens: capacity as f64, last_refill: Instant::now() }),
            capacity: capacity as f64,
            rate,
        }
    }

    fn refill(&self, state: &mut State) {
        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate).min(self.capacity);
        state.last_refill = now;
    }

    /// Consume a token if available, otherwise report how long until one
    /// accrues.
    async fn try_consume(&self) -> Result<(), Duration> {
        let mut state = self.state.lock().await;
        self.refill(&mut state);
        if state.tokens + TOKEN_SLACK >= 1.0 {
            state.tokens -= 1.0;
            return Ok(());
        }
        Err(Duration::from_secs_f64((1.0 - state.tokens) / self.rate))
    }
}

#[async_trait]
impl RateLimiter for TokenBucket {
    async fn acquire(&self) {
        // Waiters woken here race for the refilled token; the loser just
        // computes a fresh wait. No FIFO guarantee.
        loop {
            match self.try_consume().await {
                Ok(()) => return,
                Err(wait) => tokio::time::sleep(wait).await,
            }
        }
    }

    async fn try_acquire(&self) -> bool {
        self.try_consume().await.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_initial_burst_then_denial() {
        let bucket = TokenBucket::new(2.0, 5);
        for _ in 0..5 {
            assert!(bucket.try_acquire().await);
        }
        assert!(!bucket.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_grants_exactly_one_after_half_second() {
        let bucket = TokenBucket::new(2.0, 5);
        for _ in 0..5 {
            assert!(bucket.try_acquire().await);
        }
        assert!(!bucket.try_acquire().await);

        tokio::time::advance(Duration::from_millis(500)).await;
        assert!(bucket.try_acquire().await);
        assert!(!bucket.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_capped_at_capacity() {
        let bucket = TokenBucket::new(100.0, 3);
        tokio::time::advance(Duration::from_secs(60)).await;
        for _ in 0..3 {
            assert!(bucket.try_acquire().await);
        }
        assert!(!bucket.try_acquire().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_suspends_until_token_accrues() {
        let bucket = TokenBucket::new(2.0, 1);
        bucket.acquire().await;

        let start = Instant::now();
        bucket.acquire().await;
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_contending_waiters_all_complete() {
        use std::sync::Arc;

        let bucket = Arc::new(TokenBucket::new(10.0, 1));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let bucket = Arc::clone(&bucket);
            handles.push(tokio::spawn(async move { bucket.acquire().await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        // 1 burst permit + 4 refills at 10/s
        assert!(start.elapsed() >= Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_rate_bounded() {
        let bucket = TokenBucket::new(4.0, 2);
        let start = Instant::now();
        for _ in 0..10 {
            bucket.acquire().await;
        }
        // 2 burst permits, then 8 more at 4/s
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
