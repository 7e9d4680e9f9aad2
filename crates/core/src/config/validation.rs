//! Configuration validation rules.
//!
//! This module provides validation logic for `GovernorConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::{CacheBackend, GovernorConfig, RateAlgorithm};
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl GovernorConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_capacity`, `rate_capacity`, or `max_attempts` is 0
    /// - `rate_limit` is not a positive finite number
    /// - `rate_window_ms` is 0 while the sliding window algorithm is selected
    /// - `base_delay_ms` exceeds `max_delay_ms`
    ///
    /// Returns `ConfigError::Missing` if the disk backend is selected
    /// without a cache directory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_capacity".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.cache_backend == CacheBackend::Disk && self.cache_dir.as_os_str().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_dir".into(),
                hint: "Set KERB_CACHE_DIR environment variable".into(),
            });
        }

        if !self.rate_limit.is_finite() || self.rate_limit <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "rate_limit".into(),
                reason: "must be a positive finite number".into(),
            });
        }

        if self.rate_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_capacity".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.rate_algorithm == RateAlgorithm::SlidingWindow && self.rate_window_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rate_window_ms".into(),
                reason: "must be greater than 0 for the sliding window algorithm".into(),
            });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_attempts".into(),
                reason: "must be at least 1".into(),
            });
        }

        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid {
                field: "base_delay_ms".into(),
                reason: "must not exceed max_delay_ms".into(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_default_config() {
        let config = GovernorConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_cache_capacity_zero() {
        let config = GovernorConfig { cache_capacity: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_capacity"));
    }

    #[test]
    fn test_validate_disk_backend_requires_dir() {
        let config = GovernorConfig {
            cache_backend: CacheBackend::Disk,
            cache_dir: PathBuf::new(),
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Missing { field, .. }) if field == "cache_dir"));
    }

    #[test]
    fn test_validate_rate_limit_not_positive() {
        let config = GovernorConfig { rate_limit: 0.0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "rate_limit"));

        let config = GovernorConfig { rate_limit: f64::NAN, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_window_zero_only_rejected_for_sliding_window() {
        let config = GovernorConfig { rate_window_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());

        let config = GovernorConfig {
            rate_algorithm: RateAlgorithm::SlidingWindow,
            rate_window_ms: 0,
            ..Default::default()
        };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "rate_window_ms"));
    }

    #[test]
    fn test_validate_max_attempts_zero() {
        let config = GovernorConfig { max_attempts: 0, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_attempts"));
    }

    #[test]
    fn test_validate_delay_ordering() {
        let config = GovernorConfig { base_delay_ms: 5000, max_delay_ms: 1000, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "base_delay_ms"));
    }

    #[test]
    fn test_validate_edge_case_values() {
        let config = GovernorConfig {
            cache_capacity: 1,
            rate_limit: 0.1,
            rate_capacity: 1,
            max_attempts: 1,
            base_delay_ms: 1000,
            max_delay_ms: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
