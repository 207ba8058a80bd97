//! Retry configuration with builder pattern
//!
//! Remote calls are single-attempt unless configured otherwise. Retries only
//! cover transport failures; HTTP and business errors are returned as-is.

use std::time::Duration;

/// Retry behaviour for transport-level failures
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Fixed pause between attempts
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::from_millis(500),
        }
    }
}

impl RetryConfig {
    /// Create a new builder for RetryConfig
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    pub fn is_enabled(&self) -> bool {
        self.max_attempts > 1
    }
}

/// Builder for RetryConfig
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }

    /// Set total attempts (clamped to at least one)
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts.max(1);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Build the final configuration
    pub fn build(self) -> RetryConfig {
        self.config
    }
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();

        assert_eq!(config.max_attempts, 1);
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_builder_pattern() {
        let config = RetryConfig::builder()
            .max_attempts(3)
            .delay(Duration::from_millis(50))
            .build();

        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay, Duration::from_millis(50));
        assert!(config.is_enabled());
    }

    #[test]
    fn test_builder_clamps_zero_attempts() {
        let config = RetryConfig::builder().max_attempts(0).build();
        assert_eq!(config.max_attempts, 1);
    }
}
