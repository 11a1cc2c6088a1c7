//! Ensemble Types
//!
//! Request/response types for multi-model ensemble runs.

use crate::fallback::ModelFailure;
use crate::llm::types::ChatMessage;
use serde::{Deserialize, Serialize};

/// How the ensemble reconciles candidate responses into one answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Highest-scoring response wins
    #[default]
    Best,
    /// An arbiter cross-checks the candidates and writes a consensus answer
    Consensus,
    /// An arbiter merges the top candidates into one answer
    Synthesize,
}

/// A multi-model ensemble request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnsembleRequest {
    /// Conversation messages
    pub messages: Vec<ChatMessage>,
    /// Optional system instruction, prepended to the conversation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Selection mode
    #[serde(default)]
    pub mode: SelectionMode,
    /// Explicit model list; when absent the coordinator picks a default set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<Vec<String>>,
}

impl EnsembleRequest {
    /// Create a request from a single user prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(prompt)],
            ..Default::default()
        }
    }

    /// Add a message
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set the system instruction
    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    /// Set the selection mode
    pub fn with_mode(mut self, mode: SelectionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set an explicit model list
    pub fn with_models(mut self, models: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.models = Some(models.into_iter().map(Into::into).collect());
        self
    }

    /// Set the temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the max token budget
    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// Content of the latest user message, used by model selection and
    /// response scoring
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == crate::llm::types::Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Per-response quality sub-metrics, each in [0, 100]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseMetrics {
    pub coherence: f64,
    pub relevance: f64,
    pub specificity: f64,
    pub confidence: f64,
}

/// Token usage plus estimated USD cost
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResponseUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
}

/// One model's answer within an ensemble, scored
///
/// Created once per attempted model and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Model that produced the text (the serving model, after any fallback)
    pub model: String,
    /// Provider identifier
    pub provider: String,
    /// Response text
    pub text: String,
    pub usage: ResponseUsage,
    pub response_time_ms: u64,
    pub metrics: ResponseMetrics,
    /// Overall weighted score in [0, 100]
    pub score: f64,
}

impl ModelResponse {
    /// Zero-score placeholder for a model whose dispatch failed
    ///
    /// Kept for provenance; filtered out before scoring and selection.
    pub fn placeholder(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            provider: String::new(),
            text: String::new(),
            usage: ResponseUsage::default(),
            response_time_ms: 0,
            metrics: ResponseMetrics::default(),
            score: 0.0,
        }
    }
}

/// Final outcome of an ensemble run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// The answer handed to the caller
    pub best_response_text: String,
    /// Successful responses, in requested-model order (not completion order)
    pub all_responses: Vec<ModelResponse>,
    /// Model credited with the final answer
    pub selected_model: String,
    /// Sum of estimated costs across successful responses
    pub total_cost: f64,
    /// Wall-clock time for the whole ensemble
    pub processing_time_ms: u64,
    /// Confidence in the final answer, [0, 100]
    pub confidence_score: f64,
    /// Human-readable explanation of the selection
    pub reasoning: String,
    /// Every model attempted across all dispatches, for audit
    pub attempted_models: Vec<String>,
    /// Failures accumulated across all dispatches
    #[serde(skip)]
    pub failure_reasons: Vec<ModelFailure>,
}

/// Error raised by the ensemble coordinator
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnsembleError {
    /// Every selected model's dispatch failed
    #[error("all {count} ensemble models failed", count = failures.len())]
    AllModelsFailed { failures: Vec<ModelFailure> },
    /// No models to dispatch to (empty explicit list)
    #[error("no models selected for ensemble")]
    NoModelsSelected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = EnsembleRequest::from_prompt("What is 2+2?")
            .with_mode(SelectionMode::Consensus)
            .with_models(["gpt-4o-mini", "claude-3-5-haiku-20241022"])
            .with_temperature(0.2);

        assert_eq!(request.mode, SelectionMode::Consensus);
        assert_eq!(request.models.as_ref().map(Vec::len), Some(2));
        assert_eq!(request.last_user_content(), Some("What is 2+2?"));
    }

    #[test]
    fn test_placeholder_scores_zero() {
        let placeholder = ModelResponse::placeholder("gpt-4o-mini");
        assert_eq!(placeholder.score, 0.0);
        assert!(placeholder.text.is_empty());
        assert_eq!(placeholder.metrics, ResponseMetrics::default());
    }

    #[test]
    fn test_mode_serde() {
        let mode: SelectionMode = serde_json::from_str("\"synthesize\"").unwrap();
        assert_eq!(mode, SelectionMode::Synthesize);
        assert_eq!(serde_json::to_string(&SelectionMode::Best).unwrap(), "\"best\"");
    }
}
