//! Circuit Breaker State Machine
//!
//! Implements a two-state circuit breaker tracked per model:
//! - Closed: failures below threshold, or the window has expired
//! - Open: failures reached the threshold within the current window
//!
//! There is no half-open probe state and no stored state flag; openness is
//! derived from the windowed failure count. An open circuit closes again
//! once the reset window has elapsed since the window started, and the
//! next real request is the probe. The reset is lazy: it happens inside
//! `is_open`, not on a timer.

use dashmap::DashMap;
use std::time::Instant;
use tracing::{debug, warn};

use super::config::CircuitBreakerConfig;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum State {
    /// Normal operation - requests are allowed
    Closed,
    /// Circuit is open - requests are blocked
    Open,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Closed => write!(f, "closed"),
            State::Open => write!(f, "open"),
        }
    }
}

/// Per-model breaker bookkeeping
#[derive(Debug)]
struct ModelBreaker {
    failure_count: u32,
    window_start: Instant,
}

impl ModelBreaker {
    fn new() -> Self {
        Self {
            failure_count: 0,
            window_start: Instant::now(),
        }
    }
}

/// Circuit breakers keyed by model name
///
/// All methods take `&self`; per-model entries are guarded by the map's
/// internal sharded locks, which keeps the "threshold within window" check
/// correct under concurrent callers.
#[derive(Debug)]
pub struct CircuitBreakerMap {
    config: CircuitBreakerConfig,
    breakers: DashMap<String, ModelBreaker>,
}

impl CircuitBreakerMap {
    /// Create a new breaker map
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: DashMap::new(),
        }
    }

    /// Create with default configuration
    pub fn with_default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Get the configuration
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Check whether the circuit for a model is open
    ///
    /// If the reset window has elapsed the failure count is cleared here,
    /// so the caller's request doubles as the recovery probe.
    pub fn is_open(&self, model: &str) -> bool {
        if !self.config.enabled {
            return false;
        }

        let Some(mut entry) = self.breakers.get_mut(model) else {
            return false;
        };

        if entry.window_start.elapsed() >= self.config.reset_window {
            if entry.failure_count > 0 {
                debug!(model, "reset window elapsed, clearing failure count");
            }
            entry.failure_count = 0;
            return false;
        }

        entry.failure_count >= self.config.failure_threshold
    }

    /// Record a failed request against a model
    pub fn record_failure(&self, model: &str) {
        if !self.config.enabled {
            return;
        }

        let mut entry = self
            .breakers
            .entry(model.to_string())
            .or_insert_with(ModelBreaker::new);

        // First failure after a reset starts a fresh window
        if entry.failure_count == 0 {
            entry.window_start = Instant::now();
        }

        entry.failure_count += 1;

        if entry.failure_count == self.config.failure_threshold {
            warn!(
                model,
                failures = entry.failure_count,
                "failure threshold reached, circuit open"
            );
        }
    }

    /// Record a successful request against a model
    ///
    /// Clears the failure count, closing the circuit.
    pub fn record_success(&self, model: &str) {
        if !self.config.enabled {
            return;
        }

        if let Some(mut entry) = self.breakers.get_mut(model) {
            entry.failure_count = 0;
        }
    }

    /// Derived state for a model (without the lazy reset side effect)
    pub fn state(&self, model: &str) -> State {
        let open = self.config.enabled
            && self
                .breakers
                .get(model)
                .map(|e| {
                    e.window_start.elapsed() < self.config.reset_window
                        && e.failure_count >= self.config.failure_threshold
                })
                .unwrap_or(false);

        if open { State::Open } else { State::Closed }
    }

    /// Current windowed failure count for a model
    pub fn failure_count(&self, model: &str) -> u32 {
        self.breakers.get(model).map(|e| e.failure_count).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_config(threshold: u32, window_ms: u64) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(threshold)
            .with_reset_window(Duration::from_millis(window_ms))
    }

    #[test]
    fn test_closed_by_default() {
        let breakers = CircuitBreakerMap::with_default();
        assert!(!breakers.is_open("gpt-4o-mini"));
        assert_eq!(breakers.state("gpt-4o-mini"), State::Closed);
    }

    #[test]
    fn test_threshold_opens_circuit() {
        let breakers = CircuitBreakerMap::new(test_config(3, 60_000));

        breakers.record_failure("gpt-4o-mini");
        breakers.record_failure("gpt-4o-mini");
        assert!(!breakers.is_open("gpt-4o-mini"));

        breakers.record_failure("gpt-4o-mini");
        assert!(breakers.is_open("gpt-4o-mini"));
        assert_eq!(breakers.state("gpt-4o-mini"), State::Open);
    }

    #[test]
    fn test_models_tracked_independently() {
        let breakers = CircuitBreakerMap::new(test_config(2, 60_000));

        breakers.record_failure("gpt-4o-mini");
        breakers.record_failure("gpt-4o-mini");

        assert!(breakers.is_open("gpt-4o-mini"));
        assert!(!breakers.is_open("claude-3-5-haiku-20241022"));
    }

    #[test]
    fn test_success_closes_circuit() {
        let breakers = CircuitBreakerMap::new(test_config(2, 60_000));

        breakers.record_failure("gpt-4o-mini");
        breakers.record_failure("gpt-4o-mini");
        assert!(breakers.is_open("gpt-4o-mini"));

        breakers.record_success("gpt-4o-mini");
        assert!(!breakers.is_open("gpt-4o-mini"));
        assert_eq!(breakers.failure_count("gpt-4o-mini"), 0);
    }

    #[test]
    fn test_open_circuit_closes_after_window() {
        let breakers = CircuitBreakerMap::new(test_config(1, 50));

        breakers.record_failure("gpt-4o-mini");
        assert!(breakers.is_open("gpt-4o-mini"));

        std::thread::sleep(Duration::from_millis(80));
        assert!(!breakers.is_open("gpt-4o-mini"));
        assert_eq!(breakers.failure_count("gpt-4o-mini"), 0);
    }

    #[test]
    fn test_fresh_window_after_reset() {
        let breakers = CircuitBreakerMap::new(test_config(2, 50));

        breakers.record_failure("gpt-4o-mini");
        std::thread::sleep(Duration::from_millis(80));

        // The is_open check clears the stale count, so the next failure
        // starts a fresh window instead of accumulating
        assert!(!breakers.is_open("gpt-4o-mini"));
        breakers.record_failure("gpt-4o-mini");
        assert!(!breakers.is_open("gpt-4o-mini"));
        assert_eq!(breakers.failure_count("gpt-4o-mini"), 1);
    }

    #[test]
    fn test_disabled_never_opens() {
        let breakers = CircuitBreakerMap::new(CircuitBreakerConfig::disabled());

        for _ in 0..10 {
            breakers.record_failure("gpt-4o-mini");
        }
        assert!(!breakers.is_open("gpt-4o-mini"));
    }
}
