//! Selection Strategies
//!
//! Reconciles scored ensemble responses into one final answer. `best` is a
//! pure sort; `consensus` and `synthesize` each issue one extra arbiter
//! call through the fallback router, so the arbiter enjoys the same
//! resilience as any ordinary request. Arbiter failures degrade to `best`
//! rather than failing the ensemble.

use super::types::{ModelResponse, SelectionMode};
use crate::fallback::FallbackRouter;
use crate::llm::types::ChatCompletionRequest;
use std::sync::Arc;
use tracing::{debug, warn};

/// Arbiter calls must not cascade: one level of re-entry only
const MAX_ARBITER_DEPTH: u8 = 1;

/// What the selection strategy decided
#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub best_response_text: String,
    pub selected_model: String,
    /// Confidence in the final answer, [0, 100]
    pub confidence_score: f64,
    pub reasoning: String,
}

/// Applies a selection mode to a non-empty set of scored responses
pub struct Selector {
    router: Arc<FallbackRouter>,
    arbiter_model: String,
    arbiter_temperature: f32,
}

impl Selector {
    pub fn new(
        router: Arc<FallbackRouter>,
        arbiter_model: impl Into<String>,
        arbiter_temperature: f32,
    ) -> Self {
        Self {
            router,
            arbiter_model: arbiter_model.into(),
            arbiter_temperature,
        }
    }

    /// Select the final answer
    ///
    /// The coordinator filters failures and raises before reaching here, so
    /// `responses` is normally non-empty; an empty slice yields an empty
    /// outcome rather than panicking. `depth` counts arbiter re-entry; at
    /// `MAX_ARBITER_DEPTH` the arbiter modes fall back to `best`.
    pub async fn select(
        &self,
        mode: SelectionMode,
        question: &str,
        responses: &[ModelResponse],
        depth: u8,
    ) -> SelectionOutcome {
        match mode {
            SelectionMode::Best => Self::best(responses),
            SelectionMode::Consensus => self.consensus(question, responses, depth).await,
            SelectionMode::Synthesize => self.synthesize(question, responses, depth).await,
        }
    }

    /// Highest score wins; ties go to the earliest response in input order
    fn best(responses: &[ModelResponse]) -> SelectionOutcome {
        let Some(winner) = responses
            .iter()
            .reduce(|best, r| if r.score > best.score { r } else { best })
        else {
            return SelectionOutcome {
                best_response_text: String::new(),
                selected_model: String::new(),
                confidence_score: 0.0,
                reasoning: "no responses to select from".to_string(),
            };
        };

        SelectionOutcome {
            best_response_text: winner.text.clone(),
            selected_model: winner.model.clone(),
            confidence_score: winner.score,
            reasoning: format!(
                "Selected {} with score {:.1} (coherence {:.0}, relevance {:.0}, specificity {:.0}, confidence {:.0})",
                winner.model,
                winner.score,
                winner.metrics.coherence,
                winner.metrics.relevance,
                winner.metrics.specificity,
                winner.metrics.confidence,
            ),
        }
    }

    async fn consensus(
        &self,
        question: &str,
        responses: &[ModelResponse],
        depth: u8,
    ) -> SelectionOutcome {
        if responses.len() == 1 {
            let only = &responses[0];
            return SelectionOutcome {
                best_response_text: only.text.clone(),
                selected_model: only.model.clone(),
                confidence_score: only.score,
                reasoning: format!("Single response from {}, no consensus needed", only.model),
            };
        }

        if depth >= MAX_ARBITER_DEPTH {
            debug!("arbiter depth cap reached, using best strategy");
            return Self::best(responses);
        }

        let prompt = format!(
            "You are comparing {count} answers to the same question.\n\n\
             Question: {question}\n\n{answers}\n\
             Identify the facts the answers agree on and any contradictions, \
             then write a single consensus answer. Reply with the consensus \
             answer only.",
            count = responses.len(),
            answers = Self::format_candidates(responses),
        );

        match self.arbiter_call(prompt).await {
            Ok(text) => {
                let scores: Vec<f64> = responses.iter().map(|r| r.score).collect();
                let confidence = (mean(&scores) + agreement_bonus(&scores)).min(100.0);
                SelectionOutcome {
                    best_response_text: text,
                    selected_model: self.arbiter_model.clone(),
                    confidence_score: confidence,
                    reasoning: format!(
                        "Consensus across {} responses, arbitrated by {}",
                        responses.len(),
                        self.arbiter_model
                    ),
                }
            }
            Err(err) => {
                warn!(error = %err, "consensus arbiter failed, degrading to best");
                let mut outcome = Self::best(responses);
                outcome.reasoning =
                    format!("{} (consensus arbiter failed: {err})", outcome.reasoning);
                outcome
            }
        }
    }

    async fn synthesize(
        &self,
        question: &str,
        responses: &[ModelResponse],
        depth: u8,
    ) -> SelectionOutcome {
        if responses.len() == 1 {
            let only = &responses[0];
            return SelectionOutcome {
                best_response_text: only.text.clone(),
                selected_model: only.model.clone(),
                confidence_score: only.score,
                reasoning: format!("Single response from {}, nothing to synthesize", only.model),
            };
        }

        if depth >= MAX_ARBITER_DEPTH {
            debug!("arbiter depth cap reached, using best strategy");
            return Self::best(responses);
        }

        // Top three by score
        let mut ranked: Vec<&ModelResponse> = responses.iter().collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        let top: Vec<&ModelResponse> = ranked.into_iter().take(3).collect();

        let prompt = format!(
            "You are merging {count} answers to the same question into one \
             superior answer.\n\nQuestion: {question}\n\n{answers}\n\
             Combine the best elements of these answers. Reply with the \
             merged answer only.",
            count = top.len(),
            answers = Self::format_candidate_refs(&top),
        );

        match self.arbiter_call(prompt).await {
            Ok(text) => {
                let scores: Vec<f64> = top.iter().map(|r| r.score).collect();
                let confidence = (mean(&scores) + 5.0).min(95.0);
                SelectionOutcome {
                    best_response_text: text,
                    selected_model: self.arbiter_model.clone(),
                    confidence_score: confidence,
                    reasoning: format!(
                        "Synthesized from top {} responses by {}",
                        top.len(),
                        self.arbiter_model
                    ),
                }
            }
            Err(err) => {
                warn!(error = %err, "synthesis arbiter failed, degrading to best");
                let mut outcome = Self::best(responses);
                outcome.reasoning =
                    format!("{} (synthesis arbiter failed: {err})", outcome.reasoning);
                outcome
            }
        }
    }

    /// One dispatch through the fallback router at low temperature
    async fn arbiter_call(&self, prompt: String) -> Result<String, crate::fallback::DispatchError> {
        let request = ChatCompletionRequest::new(&self.arbiter_model)
            .user(prompt)
            .temperature(self.arbiter_temperature);

        let outcome = self.router.dispatch(request, &self.arbiter_model).await?;
        Ok(outcome.response.content)
    }

    fn format_candidates(responses: &[ModelResponse]) -> String {
        responses
            .iter()
            .enumerate()
            .map(|(i, r)| format!("Answer {} (from {}):\n{}\n", i + 1, r.model, r.text))
            .collect()
    }

    fn format_candidate_refs(responses: &[&ModelResponse]) -> String {
        responses
            .iter()
            .enumerate()
            .map(|(i, r)| format!("Answer {} (from {}):\n{}\n", i + 1, r.model, r.text))
            .collect()
    }
}

fn mean(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Low spread between candidate scores earns up to +10 confidence
fn agreement_bonus(scores: &[f64]) -> f64 {
    let avg = mean(scores);
    let variance =
        scores.iter().map(|s| (s - avg) * (s - avg)).sum::<f64>() / scores.len() as f64;
    (10.0 - variance / 10.0).max(0.0)
}
