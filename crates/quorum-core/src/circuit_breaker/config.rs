//! Circuit Breaker Configuration
//!
//! Configuration options for per-model circuit breakers.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a circuit breaker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Number of failures within the window before opening the circuit
    pub failure_threshold: u32,
    /// Window duration for failure counting; also how long the circuit
    /// stays open before the next request is let through
    pub reset_window: Duration,
    /// Whether circuit breaking is enabled
    pub enabled: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            reset_window: Duration::from_secs(60),
            enabled: true,
        }
    }
}

impl CircuitBreakerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the failure threshold
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Set the reset window
    pub fn with_reset_window(mut self, window: Duration) -> Self {
        self.reset_window = window;
        self
    }

    /// Enable or disable circuit breaking
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Create a strict configuration (opens quickly)
    pub fn strict() -> Self {
        Self {
            failure_threshold: 2,
            reset_window: Duration::from_secs(120),
            enabled: true,
        }
    }

    /// Create a disabled configuration (no circuit breaking)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.reset_window.as_secs(), 60);
    }

    #[test]
    fn test_strict_config() {
        let config = CircuitBreakerConfig::strict();
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.reset_window.as_secs(), 120);
    }

    #[test]
    fn test_disabled_config() {
        let config = CircuitBreakerConfig::disabled();
        assert!(!config.enabled);
    }

    #[test]
    fn test_builder() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(3)
            .with_reset_window(Duration::from_secs(30));
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.reset_window.as_secs(), 30);
    }
}
