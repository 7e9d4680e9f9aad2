//! Governor configuration with layered loading.
//!
//! Configuration is loaded with figment from multiple sources:
//!
//! 1. Environment variables (KERB_*)
//! 2. TOML config file (if KERB_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Cache backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    Memory,
    Disk,
}

/// Rate limiting algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateAlgorithm {
    #[default]
    TokenBucket,
    SlidingWindow,
}

/// Jitter applied to computed backoff delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterMode {
    /// Use the computed delay unmodified.
    #[default]
    None,
    /// Uniform random in `[0, delay]`.
    Full,
    /// `delay/2` plus uniform random in `[0, delay/2]`.
    Equal,
}

/// Configuration for the request governance pipeline.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (KERB_*)
/// 2. TOML config file (if KERB_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernorConfig {
    /// Cache backend: in-memory LRU or on-disk file-per-key.
    ///
    /// Set via KERB_CACHE_BACKEND environment variable.
    #[serde(default)]
    pub cache_backend: CacheBackend,

    /// Directory for the disk cache backend.
    ///
    /// Set via KERB_CACHE_DIR environment variable.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Maximum number of cached entries.
    ///
    /// Set via KERB_CACHE_CAPACITY environment variable.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Default time-to-live for cached entries in seconds. 0 means
    /// entries never expire until evicted by capacity.
    ///
    /// Set via KERB_DEFAULT_TTL_SECS environment variable.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Rate limiting algorithm.
    ///
    /// Set via KERB_RATE_ALGORITHM environment variable.
    #[serde(default)]
    pub rate_algorithm: RateAlgorithm,

    /// Sustained rate: tokens per second for the token bucket, or the
    /// permitted request count per window for the sliding window.
    ///
    /// Set via KERB_RATE_LIMIT environment variable.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Burst capacity for the token bucket.
    ///
    /// Set via KERB_RATE_CAPACITY environment variable.
    #[serde(default = "default_rate_capacity")]
    pub rate_capacity: u32,

    /// Sliding window size in milliseconds.
    ///
    /// Set via KERB_RATE_WINDOW_MS environment variable.
    #[serde(default = "default_rate_window_ms")]
    pub rate_window_ms: u64,

    /// Maximum transport invocations per logical request.
    ///
    /// Set via KERB_MAX_ATTEMPTS environment variable.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds.
    ///
    /// Set via KERB_BASE_DELAY_MS environment variable.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Backoff delay ceiling in milliseconds.
    ///
    /// Set via KERB_MAX_DELAY_MS environment variable.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Jitter applied to backoff delays.
    ///
    /// Set via KERB_JITTER_MODE environment variable.
    #[serde(default)]
    pub jitter_mode: JitterMode,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("./.kerb-cache")
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_rate_limit() -> f64 {
    1.0
}

fn default_rate_capacity() -> u32 {
    5
}

fn default_rate_window_ms() -> u64 {
    1000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            cache_backend: CacheBackend::Memory,
            cache_dir: default_cache_dir(),
            cache_capacity: default_cache_capacity(),
            default_ttl_secs: default_ttl_secs(),
            rate_algorithm: RateAlgorithm::TokenBucket,
            rate_limit: default_rate_limit(),
            rate_capacity: default_rate_capacity(),
            rate_window_ms: default_rate_window_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_mode: JitterMode::None,
        }
    }
}

impl GovernorConfig {
    /// Default entry TTL as a `Duration`; `None` means entries never expire.
    pub fn default_ttl(&self) -> Option<Duration> {
        (self.default_ttl_secs > 0).then(|| Duration::from_secs(self.default_ttl_secs))
    }

    /// Initial backoff delay as a `Duration`.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Backoff ceiling as a `Duration`.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Sliding window size as a `Duration`.
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `KERB_`
    /// 2. TOML file from `KERB_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("KERB_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("KERB_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
