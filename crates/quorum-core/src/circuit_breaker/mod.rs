//! Circuit Breaker Pattern Implementation
//!
//! Provides a per-model circuit breaker used by the fallback router.
//! It includes:
//! - A two-state circuit breaker state machine (closed, open)
//! - Lazily windowed failure counting
//! - Per-model breaker instances behind a concurrent map
//!
//! # Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                      Circuit Breaker                          |
//! +---------------------------------------------------------------+
//! |                                                               |
//! |    +---------+    failure threshold     +--------+            |
//! |    | CLOSED  | -----------------------> |  OPEN  |            |
//! |    +---------+                          +--------+            |
//! |         ^                                    |                |
//! |         |   reset window elapsed,            |                |
//! |         |   or a success recorded            |                |
//! |         +------------------------------------+                |
//! |                                                               |
//! +---------------------------------------------------------------+
//! ```
//!
//! There is deliberately no half-open state: once the reset window has
//! elapsed the circuit closes and the next live request acts as the probe.
//!
//! # Usage
//!
//! ```rust,ignore
//! use quorum_core::circuit_breaker::{CircuitBreakerConfig, CircuitBreakerMap};
//!
//! let breakers = CircuitBreakerMap::new(CircuitBreakerConfig::default());
//!
//! if !breakers.is_open("gpt-4o-mini") {
//!     match call_model().await {
//!         Ok(_) => breakers.record_success("gpt-4o-mini"),
//!         Err(_) => breakers.record_failure("gpt-4o-mini"),
//!     }
//! }
//! ```

pub mod config;
pub mod state;

pub use config::CircuitBreakerConfig;
pub use state::{CircuitBreakerMap, State};
