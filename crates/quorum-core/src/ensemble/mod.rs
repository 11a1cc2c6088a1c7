//! Multi-Model Ensembles
//!
//! Queries several models concurrently for the same request and reconciles
//! their answers into one. The pipeline is:
//!
//! ```text
//! EnsembleRequest
//!     |
//!     v
//! EnsembleCoordinator  -- concurrent fan-out, one FallbackRouter
//!     |                   dispatch per selected model
//!     v
//! ResponseScorer       -- per-response quality heuristics
//!     |
//!     v
//! Selector             -- best | consensus | synthesize
//!     |
//!     v
//! EnsembleResult
//! ```

pub mod coordinator;
pub mod scorer;
pub mod selection;
pub mod types;

pub use coordinator::EnsembleCoordinator;
pub use scorer::{HeuristicScorer, ResponseScorer, ScoredResponse};
pub use selection::{SelectionOutcome, Selector};
pub use types::{
    EnsembleError, EnsembleRequest, EnsembleResult, ModelResponse, ResponseMetrics, ResponseUsage,
    SelectionMode,
};
