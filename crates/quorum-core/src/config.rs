//! Orchestrator Configuration
//!
//! Static, process-wide configuration: the fallback chain table, circuit
//! breaker thresholds, and the model roster used by ensemble selection.
//! Loaded once at startup (defaults, builders, or a TOML document) and
//! read-only afterwards.

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::fallback::FallbackChains;
use crate::llm::types::LLMError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Terminal model of every fallback chain
    pub default_model: String,
    /// Model -> ordered fallback list
    pub fallback_chains: HashMap<String, Vec<String>>,
    /// Circuit breaker thresholds
    pub circuit_breaker: CircuitBreakerConfig,
    /// Fixed baseline set for ensemble runs without an explicit model list
    pub baseline_models: Vec<String>,
    /// Added to the ensemble when the conversation or latest message is long
    pub long_context_model: String,
    /// Added to the ensemble on creative-writing prompts
    pub creative_model: String,
    /// Arbiter used by consensus/synthesize
    pub arbiter_model: String,
    /// Arbiter sampling temperature (kept low for judging work)
    pub arbiter_temperature: f32,
    /// Single low-latency model used by the streaming path
    pub stream_model: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_model: "gpt-4o-mini".to_string(),
            fallback_chains: HashMap::from([
                (
                    "gpt-4o".to_string(),
                    vec![
                        "gpt-4o-mini".to_string(),
                        "claude-3-5-sonnet-20241022".to_string(),
                    ],
                ),
                (
                    "claude-3-5-sonnet-20241022".to_string(),
                    vec!["claude-3-5-haiku-20241022".to_string(), "gpt-4o".to_string()],
                ),
                (
                    "gemini-2.0-flash".to_string(),
                    vec!["gpt-4o-mini".to_string()],
                ),
            ]),
            circuit_breaker: CircuitBreakerConfig::default(),
            baseline_models: vec![
                "gpt-4o-mini".to_string(),
                "claude-3-5-haiku-20241022".to_string(),
                "gemini-2.0-flash".to_string(),
            ],
            long_context_model: "gpt-4o".to_string(),
            creative_model: "claude-3-5-sonnet-20241022".to_string(),
            arbiter_model: "gpt-4o".to_string(),
            arbiter_temperature: 0.3,
            stream_model: "gemini-2.0-flash".to_string(),
        }
    }
}

impl OrchestratorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self, LLMError> {
        toml::from_str(raw).map_err(|e| LLMError::ConfigError(e.to_string()))
    }

    /// Set the default terminal model
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Add a fallback chain
    pub fn with_fallback_chain(
        mut self,
        model: impl Into<String>,
        fallbacks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.fallback_chains.insert(
            model.into(),
            fallbacks.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Set circuit breaker thresholds
    pub fn with_circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    /// Replace the ensemble baseline set
    pub fn with_baseline_models(
        mut self,
        models: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.baseline_models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the arbiter model
    pub fn with_arbiter_model(mut self, model: impl Into<String>) -> Self {
        self.arbiter_model = model.into();
        self
    }

    /// Set the streaming model
    pub fn with_stream_model(mut self, model: impl Into<String>) -> Self {
        self.stream_model = model.into();
        self
    }

    /// Build the chain table consumed by the fallback router
    pub fn chains(&self) -> FallbackChains {
        let mut chains = FallbackChains::new(&self.default_model);
        for (model, fallbacks) in &self.fallback_chains {
            chains = chains.with_chain(model, fallbacks.iter().cloned());
        }
        chains
    }
}
