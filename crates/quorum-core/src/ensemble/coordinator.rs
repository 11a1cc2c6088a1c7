//! Ensemble Coordinator
//!
//! Fans one request out to several models concurrently, scores every
//! answer, and hands the scored set to the selection strategy. Each
//! individual dispatch goes through the fallback router, so a model's
//! failure may walk that model's own fallback chain before it counts as
//! an ensemble-level failure.
//!
//! The coordinator waits for every dispatch to settle. It does not cancel
//! on first failure, does not race for first success, and sets no per-call
//! timeout; a hung backend stalls the whole ensemble.

use super::scorer::ResponseScorer;
use super::selection::{SelectionOutcome, Selector};
use super::types::{
    EnsembleError, EnsembleRequest, EnsembleResult, ModelResponse, ResponseUsage,
};
use crate::config::OrchestratorConfig;
use crate::fallback::{DispatchError, FallbackRouter, ModelFailure};
use crate::llm::pricing::estimate_cost;
use crate::llm::provider::ChatStream;
use crate::llm::types::{ChatCompletionRequest, ChatMessage, LLMResult};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Keywords that flag a prompt as creative writing
const CREATIVE_KEYWORDS: &[&str] = &[
    "write", "story", "poem", "creative", "imagine", "draft", "compose",
];

/// A conversation longer than this many messages pulls in the
/// long-context model
const LONG_CONVERSATION_MESSAGES: usize = 10;

/// So does a latest message longer than this many characters
const LONG_MESSAGE_CHARS: usize = 500;

/// Multi-model ensemble coordinator
pub struct EnsembleCoordinator {
    router: Arc<FallbackRouter>,
    scorer: Arc<dyn ResponseScorer>,
    selector: Selector,
    config: OrchestratorConfig,
}

impl EnsembleCoordinator {
    pub fn new(
        router: Arc<FallbackRouter>,
        scorer: Arc<dyn ResponseScorer>,
        config: OrchestratorConfig,
    ) -> Self {
        let selector = Selector::new(
            Arc::clone(&router),
            config.arbiter_model.clone(),
            config.arbiter_temperature,
        );
        Self {
            router,
            scorer,
            selector,
            config,
        }
    }

    /// Run a full ensemble: fan out, score, select
    pub async fn run(&self, request: EnsembleRequest) -> Result<EnsembleResult, EnsembleError> {
        let started = Instant::now();

        // An explicit list is honored verbatim, duplicates included; only
        // the heuristic default set is de-duplicated
        let models = match &request.models {
            Some(explicit) => explicit.clone(),
            None => self.select_models(&request),
        };
        if models.is_empty() {
            return Err(EnsembleError::NoModelsSelected);
        }

        info!(models = ?models, mode = ?request.mode, "running ensemble");

        let question = request.last_user_content().unwrap_or_default().to_string();
        let chat_request = build_chat_request(&request);

        // Concurrent fan-out; wait for every dispatch to settle
        let dispatches = models.iter().map(|model| {
            let chat_request = chat_request.clone();
            async move {
                let call_started = Instant::now();
                let outcome = self.router.dispatch(chat_request, model).await;
                (model.clone(), call_started.elapsed().as_millis() as u64, outcome)
            }
        });
        let settled = join_all(dispatches).await;

        let mut attempted_models = Vec::new();
        let mut failure_reasons = Vec::new();
        let mut responses = Vec::new();

        for (requested, elapsed_ms, outcome) in settled {
            match outcome {
                Ok(outcome) => {
                    attempted_models.extend(outcome.attempted_models);
                    failure_reasons.extend(outcome.failure_reasons);

                    let scored = self.scorer.evaluate(
                        &question,
                        &outcome.response.content,
                        elapsed_ms,
                    );
                    let usage = outcome.response.usage.unwrap_or_default();
                    responses.push(ModelResponse {
                        model: outcome.response.model.clone(),
                        provider: outcome.response.provider.clone(),
                        text: outcome.response.content,
                        usage: ResponseUsage {
                            prompt_tokens: usage.prompt_tokens,
                            completion_tokens: usage.completion_tokens,
                            total_tokens: usage.total_tokens,
                            cost: estimate_cost(&outcome.response.model, &usage),
                        },
                        response_time_ms: elapsed_ms,
                        metrics: scored.metrics,
                        score: scored.score,
                    });
                }
                Err(err) => {
                    warn!(model = %requested, error = %err, "ensemble member failed");
                    attempted_models.push(requested.clone());
                    match err {
                        DispatchError::AllAttemptsFailed { failures, .. } => {
                            failure_reasons.extend(failures);
                        }
                        DispatchError::Fatal { model, source, .. } => {
                            failure_reasons.push(ModelFailure::new(model, source.to_string()));
                        }
                    }
                    responses.push(ModelResponse::placeholder(requested));
                }
            }
        }

        // Placeholders never reach scoring or selection
        let scored: Vec<ModelResponse> =
            responses.into_iter().filter(|r| r.score > 0.0).collect();

        if scored.is_empty() {
            return Err(EnsembleError::AllModelsFailed {
                failures: failure_reasons,
            });
        }

        let SelectionOutcome {
            best_response_text,
            selected_model,
            confidence_score,
            reasoning,
        } = self
            .selector
            .select(request.mode, &question, &scored, 0)
            .await;

        let total_cost = scored.iter().map(|r| r.usage.cost).sum();

        Ok(EnsembleResult {
            best_response_text,
            all_responses: scored,
            selected_model,
            total_cost,
            processing_time_ms: started.elapsed().as_millis() as u64,
            confidence_score,
            reasoning,
            attempted_models,
            failure_reasons,
        })
    }

    /// Stream a single fixed low-latency model's answer
    ///
    /// Streaming deliberately does not stream a multi-model comparison;
    /// the configured stream model answers alone, regardless of mode.
    pub async fn stream(&self, request: EnsembleRequest) -> LLMResult<ChatStream> {
        let mut chat_request = build_chat_request(&request);
        chat_request.model = self.config.stream_model.clone();

        debug!(model = %chat_request.model, "streaming single-model ensemble");

        let backend = self.router.registry().for_model(&chat_request.model)?;
        backend.chat_stream(chat_request).await
    }

    /// Default model set for requests without an explicit list
    ///
    /// A fixed baseline, plus the long-context model for long
    /// conversations or long latest messages, plus the creative model when
    /// the latest message smells like creative writing.
    fn select_models(&self, request: &EnsembleRequest) -> Vec<String> {
        let mut models = self.config.baseline_models.clone();

        let last = request.last_user_content().unwrap_or_default();

        if request.messages.len() > LONG_CONVERSATION_MESSAGES || last.len() > LONG_MESSAGE_CHARS {
            models.push(self.config.long_context_model.clone());
        }

        let last_lower = last.to_lowercase();
        if CREATIVE_KEYWORDS.iter().any(|k| last_lower.contains(k)) {
            models.push(self.config.creative_model.clone());
        }

        dedupe(models)
    }
}

fn dedupe(models: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    models.into_iter().filter(|m| seen.insert(m.clone())).collect()
}

/// Lower an ensemble request into the backend chat format
fn build_chat_request(request: &EnsembleRequest) -> ChatCompletionRequest {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(ref system) = request.system_instruction {
        messages.push(ChatMessage::system(system.clone()));
    }
    messages.extend(request.messages.iter().cloned());

    ChatCompletionRequest {
        model: String::new(),
        messages,
        temperature: request.temperature,
        max_tokens: request.max_tokens,
        top_p: request.top_p,
        stop: None,
        stream: None,
    }
}
