//! Exponential backoff retry policy.
//!
//! The policy is a pure function of (attempt index, retryability): it
//! keeps no state of its own, so each logical request owns its attempt
//! counter and concurrent calls never interfere.

use std::time::Duration;

use kerb_core::config::{GovernorConfig, JitterMode};
use rand::Rng;

/// Decides whether and how long to wait before retrying a failed attempt.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: JitterMode,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: JitterMode::None,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration, jitter: JitterMode) -> Self {
        Self { max_attempts, base_delay, max_delay, jitter }
    }

    pub fn from_config(config: &GovernorConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.max_delay(), config.jitter_mode)
    }

    /// Maximum transport invocations this policy permits.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Decide the wait after the failure of the 0-based `attempt`.
    ///
    /// Returns `None` when the error is non-retryable or the next attempt
    /// would exceed `max_attempts`, meaning the caller must stop and
    /// surface the failure.
    pub fn next_delay(&self, attempt: u32, retryable: bool) -> Option<Duration> {
        if !retryable || attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }
        Some(self.jittered(self.backoff(attempt)))
    }

    /// `min(max_delay, base_delay * 2^attempt)`.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        match self.jitter {
            JitterMode::None => delay,
            JitterMode::Full => delay.mul_f64(rand::thread_rng().r#gen::<f64>()),
            JitterMode::Equal => {
                let half = delay / 2;
                half + half.mul_f64(rand::thread_rng().r#gen::<f64>())
            }
        }
    }
}
