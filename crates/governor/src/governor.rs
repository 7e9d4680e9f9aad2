//! The request governor: cache, rate limiter, and retry policy composed
//! around a caller-supplied transport.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use kerb_core::cache::{CacheStore, CachedResponse, DiskCache, MemoryCache};
use kerb_core::config::{CacheBackend, GovernorConfig, RateAlgorithm};
use tokio_util::sync::CancellationToken;

use crate::error::{BoxError, GovernorError};
use crate::limit::{RateLimiter, SlidingWindow, TokenBucket};
use crate::retry::RetryPolicy;

/// Per-call controls for [`Governor::execute_with_options`].
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Deadline for rate limiter acquisition. Exceeding it surfaces
    /// [`GovernorError::LimiterTimeout`] and skips remaining attempts.
    pub deadline: Option<Duration>,

    /// Cancellation signal. Firing it aborts any suspended wait with
    /// [`GovernorError::Cancelled`].
    pub cancel: Option<CancellationToken>,
}

/// Governs each logical request: cache first, then rate-limited,
/// retried transport invocation, then a single cache write.
///
/// Cache and limiter are shared behind `Arc`, so many concurrent
/// `execute` calls (and many governors) can use the same instances;
/// retry state is per call and never shared.
#[derive(Clone)]
pub struct Governor {
    cache: Arc<dyn CacheStore>,
    limiter: Arc<dyn RateLimiter>,
    policy: RetryPolicy,
    classify: Arc<dyn Fn(&BoxError) -> bool + Send + Sync>,
    default_ttl: Option<Duration>,
}

impl Governor {
    /// Compose a governor from its three parts.
    ///
    /// Every error is considered retryable until a classifier is
    /// installed with [`Governor::with_classifier`], and entries use the
    /// configuration default TTL until [`Governor::with_default_ttl`].
    pub fn new(cache: Arc<dyn CacheStore>, limiter: Arc<dyn RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            cache,
            limiter,
            policy,
            classify: Arc::new(|_| true),
            default_ttl: GovernorConfig::default().default_ttl(),
        }
    }

    /// Build a governor with config-selected backend and algorithm.
    pub fn from_config(config: &GovernorConfig) -> Result<Self, kerb_core::Error> {
        let cache: Arc<dyn CacheStore> = match config.cache_backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new(config.cache_capacity)),
            CacheBackend::Disk => Arc::new(DiskCache::open(&config.cache_dir, config.cache_capacity)?),
        };
        let limiter: Arc<dyn RateLimiter> = match config.rate_algorithm {
            RateAlgorithm::TokenBucket => Arc::new(TokenBucket::new(config.rate_limit, config.rate_capacity)),
            RateAlgorithm::SlidingWindow => {
                let limit = config.rate_limit.round().max(1.0) as usize;
                Arc::new(SlidingWindow::new(limit, config.rate_window()))
            }
        };
        Ok(Self::new(cache, limiter, RetryPolicy::from_config(config)).with_default_ttl(config.default_ttl()))
    }

    /// Install the retryability predicate for transport errors.
    pub fn with_classifier(mut self, classify: impl Fn(&BoxError) -> bool + Send + Sync + 'static) -> Self {
        self.classify = Arc::new(classify);
        self
    }

    /// Set the TTL applied when `execute` is called without one.
    /// `None` means such entries never expire.
    pub fn with_default_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// The cache shared by this governor.
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    /// Execute a logical request.
    ///
    /// `ttl` of `None` falls back to the governor default; a zero
    /// duration means the entry never expires. See
    /// [`Governor::execute_with_options`].
    pub async fn execute<F, Fut>(&self, key: &str, ttl: Option<Duration>, transport: F) -> Result<CachedResponse, GovernorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<CachedResponse, BoxError>>,
    {
        self.execute_with_options(key, ttl, transport, ExecuteOptions::default()).await
    }

    /// Execute a logical request with per-call deadline and cancellation.
    ///
    /// A cache hit returns immediately with no rate-limit or transport
    /// cost. On a miss, each attempt acquires a limiter permit and
    /// invokes `transport`; failures consult the retry policy, and a
    /// success writes the cache exactly once. Transport invocations are
    /// bounded by the policy's `max_attempts`.
    pub async fn execute_with_options<F, Fut>(
        &self,
        key: &str,
        ttl: Option<Duration>,
        mut transport: F,
        options: ExecuteOptions,
    ) -> Result<CachedResponse, GovernorError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<CachedResponse, BoxError>>,
    {
        if let Some(hit) = self.cache.get(key).await {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }

        let entry_ttl = ttl.or(self.default_ttl);
        let mut attempt: u32 = 0;
        loop {
            self.acquire_permit(&options).await?;

            match transport().await {
                Ok(value) => {
                    if let Err(e) = self.cache.put(key, value.clone(), entry_ttl).await {
                        // The response is already in hand; a failed write
                        // only costs a future cache miss.
                        tracing::warn!(key, error = %e, "cache write failed");
                    }
                    tracing::debug!(key, attempts = attempt + 1, "request succeeded");
                    return Ok(value);
                }
                Err(err) => {
                    let retryable = (self.classify)(&err);
                    match self.policy.next_delay(attempt, retryable) {
                        Some(delay) => {
                            tracing::warn!(key, attempt = attempt + 1, delay_ms = delay.as_millis() as u64, error = %err, "attempt failed, backing off");
                            attempt += 1;
                            self.backoff_wait(delay, &options).await?;
                        }
                        None if retryable => {
                            tracing::warn!(key, attempts = attempt + 1, error = %err, "retries exhausted");
                            return Err(GovernorError::RetriesExhausted { attempts: attempt + 1, source: err });
                        }
                        None => {
                            tracing::warn!(key, error = %err, "non-retryable transport failure");
                            return Err(GovernorError::Transport(err));
                        }
                    }
                }
            }
        }
    }

    async fn acquire_permit(&self, options: &ExecuteOptions) -> Result<(), GovernorError> {
        let limited = async {
            if let Some(deadline) = options.deadline {
                tokio::time::timeout(deadline, self.limiter.acquire())
                    .await
                    .map_err(|_| GovernorError::LimiterTimeout(deadline))
            } else {
                self.limiter.acquire().await;
                Ok(())
            }
        };

        if let Some(cancel) = &options.cancel {
            tokio::select! {
                _ = cancel.cancelled() => Err(GovernorError::Cancelled),
                permit = limited => permit,
            }
        } else {
            limited.await
        }
    }

    async fn backoff_wait(&self, delay: Duration, options: &ExecuteOptions) -> Result<(), GovernorError> {
        if let Some(cancel) = &options.cancel {
            tokio::select! {
                _ = cancel.cancelled() => Err(GovernorError::Cancelled),
                _ = tokio::time::sleep(delay) => Ok(()),
            }
        } else {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}
