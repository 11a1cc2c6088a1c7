//! # Quorum Core
//!
//! 弹性多模型 LLM 编排层
//! Resilient multi-model LLM orchestration layer
//!
//! 把多个 LLM 提供商组合成一个可靠的整体：回退链、按模型熔断、
//! 并发集成与启发式响应评分
//! Combines multiple LLM providers into one dependable whole: fallback
//! chains, per-model circuit breaking, concurrent ensembles, and heuristic
//! response scoring.
//!
//! # 架构
//! # Architecture
//!
//! ```text
//! +------------------------------------------------------------+
//! |                      AiOrchestrator                        |
//! |   dispatch / dispatch_with_breaker / run_ensemble / stream |
//! +---------------------+--------------------------------------+
//! |   FallbackRouter    |        EnsembleCoordinator           |
//! |  (chain walking)    |  (fan-out, scoring, selection)       |
//! +---------------------+--------------------------------------+
//! |        CircuitBreakerMap (per-model, two-state)            |
//! +------------------------------------------------------------+
//! |     BackendRegistry: OpenAI | Anthropic | Gemini | ...     |
//! +------------------------------------------------------------+
//! ```
//!
//! # 快速开始
//! # Quick Start
//!
//! ```rust,ignore
//! use quorum_core::{AiOrchestrator, EnsembleRequest, OrchestratorConfig, SelectionMode};
//!
//! let orchestrator = AiOrchestrator::from_env(OrchestratorConfig::default())?;
//!
//! // 单模型调度，自动回退
//! // Single-model dispatch with automatic fallback
//! let answer = orchestrator.ask("What is the capital of France?").await?;
//!
//! // 多模型集成
//! // Multi-model ensemble
//! let result = orchestrator
//!     .run_ensemble(
//!         EnsembleRequest::from_prompt("Explain TCP slow start.")
//!             .with_mode(SelectionMode::Consensus),
//!     )
//!     .await?;
//! println!("{} ({})", result.best_response_text, result.selected_model);
//! ```

pub mod circuit_breaker;
pub mod config;
pub mod ensemble;
pub mod fallback;
pub mod llm;
pub mod orchestrator;

pub use circuit_breaker::{CircuitBreakerConfig, CircuitBreakerMap, State};
pub use config::OrchestratorConfig;
pub use ensemble::{
    EnsembleCoordinator, EnsembleError, EnsembleRequest, EnsembleResult, HeuristicScorer,
    ModelResponse, ResponseMetrics, ResponseScorer, ResponseUsage, ScoredResponse, SelectionMode,
    SelectionOutcome, Selector,
};
pub use fallback::{
    DispatchError, FallbackChains, FallbackOutcome, FallbackRouter, ModelFailure,
};
pub use llm::{
    BackendRegistry, ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ChatStream,
    ErrorDisposition, FinishReason, LLMError, LLMProvider, LLMResult, ProviderKind, Role, Usage,
};
pub use orchestrator::AiOrchestrator;
