//! Fallback Routing
//!
//! Routes a chat request down an ordered chain of alternative models,
//! consulting the per-model circuit breaker before each attempt. A chain
//! is `[primary] ++ configured fallbacks`, or `[primary, default]` when no
//! fallbacks are configured, so every chain is finite and terminates.
//!
//! Authentication errors abort the whole chain: a bad credential cannot be
//! fixed by trying another model on the same account. Everything else
//! (unknown model, rate limit, 5xx, network failure) advances to the next
//! candidate.

use crate::circuit_breaker::CircuitBreakerMap;
use crate::llm::provider::BackendRegistry;
use crate::llm::types::{
    ChatCompletionRequest, ChatCompletionResponse, ErrorDisposition, LLMError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One failed attempt within a fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFailure {
    pub model: String,
    pub reason: String,
}

impl ModelFailure {
    pub fn new(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ModelFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.model, self.reason)
    }
}

/// Error raised by the fallback router
#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    /// Every candidate in the chain failed
    #[error("all {count} fallback attempts failed for '{primary}'", count = failures.len())]
    AllAttemptsFailed {
        primary: String,
        failures: Vec<ModelFailure>,
    },
    /// A fatal error aborted the chain before it was exhausted
    #[error("fatal error from '{model}': {source}")]
    Fatal {
        model: String,
        /// Models attempted before the abort, the aborting one included
        attempted_models: Vec<String>,
        #[source]
        source: LLMError,
    },
}

impl DispatchError {
    /// The per-model failure list, where one exists
    pub fn failures(&self) -> &[ModelFailure] {
        match self {
            Self::AllAttemptsFailed { failures, .. } => failures,
            Self::Fatal { .. } => &[],
        }
    }
}

/// Successful outcome of a dispatch
#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    /// The winning response
    pub response: ChatCompletionResponse,
    /// Whether a model other than the primary served the request
    pub fallback_occurred: bool,
    /// Every model attempted (or skipped on an open circuit), in order
    pub attempted_models: Vec<String>,
    /// Failures accumulated before the winning attempt
    pub failure_reasons: Vec<ModelFailure>,
}

/// Static model -> ordered fallback list configuration
///
/// Read-only once constructed; chains are acyclic by construction since
/// `chain_for` de-duplicates.
#[derive(Debug, Clone)]
pub struct FallbackChains {
    chains: HashMap<String, Vec<String>>,
    default_model: String,
}

impl FallbackChains {
    /// Create an empty chain table with a default terminal model
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            chains: HashMap::new(),
            default_model: default_model.into(),
        }
    }

    /// Add a fallback chain for a model
    pub fn with_chain(
        mut self,
        model: impl Into<String>,
        fallbacks: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.chains.insert(
            model.into(),
            fallbacks.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// The default terminal model
    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Build the full candidate chain for a primary model
    ///
    /// `[primary] ++ configured fallbacks`, or `[primary, default]` if no
    /// fallbacks are configured. Duplicates are dropped, preserving first
    /// occurrence, which also keeps chains acyclic.
    pub fn chain_for(&self, primary: &str) -> Vec<String> {
        let mut chain = vec![primary.to_string()];

        match self.chains.get(primary) {
            Some(fallbacks) if !fallbacks.is_empty() => {
                chain.extend(fallbacks.iter().cloned());
            }
            _ => chain.push(self.default_model.clone()),
        }

        let mut seen = std::collections::HashSet::new();
        chain.retain(|m| seen.insert(m.clone()));
        chain
    }

    /// The single model to route to when the primary's circuit is open
    pub fn recommended_fallback(&self, primary: &str) -> Option<String> {
        self.chain_for(primary).into_iter().nth(1)
    }
}

/// Fallback router
///
/// Owns the backend registry, the chain table, and a handle to the shared
/// circuit breakers.
pub struct FallbackRouter {
    registry: BackendRegistry,
    breakers: Arc<CircuitBreakerMap>,
    chains: FallbackChains,
}

impl FallbackRouter {
    pub fn new(
        registry: BackendRegistry,
        breakers: Arc<CircuitBreakerMap>,
        chains: FallbackChains,
    ) -> Self {
        Self {
            registry,
            breakers,
            chains,
        }
    }

    /// The shared circuit breakers
    pub fn breakers(&self) -> &Arc<CircuitBreakerMap> {
        &self.breakers
    }

    /// The chain configuration
    pub fn chains(&self) -> &FallbackChains {
        &self.chains
    }

    /// The backend registry
    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Dispatch a request down the primary model's fallback chain
    ///
    /// Walks the chain in order, skipping candidates with an open circuit,
    /// until one succeeds. Records success/failure in the breaker per
    /// attempt. Fails with `AllAttemptsFailed` carrying every (model,
    /// reason) pair when the chain is exhausted, or `Fatal` when an
    /// authentication-class error aborts the walk.
    pub async fn dispatch(
        &self,
        request: ChatCompletionRequest,
        primary: &str,
    ) -> Result<FallbackOutcome, DispatchError> {
        let chain = self.chains.chain_for(primary);
        debug!(primary, candidates = chain.len(), "dispatching");

        let mut attempted = Vec::new();
        let mut failures = Vec::new();

        for candidate in &chain {
            attempted.push(candidate.clone());

            if self.breakers.is_open(candidate) {
                debug!(model = %candidate, "circuit open, skipping candidate");
                failures.push(ModelFailure::new(candidate, "circuit open"));
                continue;
            }

            let backend = match self.registry.for_model(candidate) {
                Ok(backend) => backend,
                Err(err) => {
                    failures.push(ModelFailure::new(candidate, err.to_string()));
                    continue;
                }
            };

            let mut attempt = request.clone();
            attempt.model = candidate.clone();

            match backend.chat(attempt).await {
                Ok(response) => {
                    self.breakers.record_success(candidate);
                    let fallback_occurred = candidate != primary;
                    if fallback_occurred {
                        info!(primary, served_by = %candidate, "request served by fallback");
                    }
                    return Ok(FallbackOutcome {
                        response,
                        fallback_occurred,
                        attempted_models: attempted,
                        failure_reasons: failures,
                    });
                }
                Err(err) => {
                    self.breakers.record_failure(candidate);
                    warn!(model = %candidate, error = %err, "candidate failed");

                    match ErrorDisposition::from_error(&err) {
                        ErrorDisposition::Fatal => {
                            return Err(DispatchError::Fatal {
                                model: candidate.clone(),
                                attempted_models: attempted,
                                source: err,
                            });
                        }
                        ErrorDisposition::Retryable => {
                            failures.push(ModelFailure::new(candidate, err.to_string()));
                        }
                    }
                }
            }
        }

        Err(DispatchError::AllAttemptsFailed {
            primary: primary.to_string(),
            failures,
        })
    }

    /// Dispatch, short-circuiting an open primary to its recommended fallback
    ///
    /// When the primary's circuit is open this routes directly to the single
    /// recommended fallback instead of walking the full chain. Otherwise it
    /// behaves exactly like `dispatch`.
    pub async fn dispatch_with_breaker(
        &self,
        request: ChatCompletionRequest,
        primary: &str,
    ) -> Result<FallbackOutcome, DispatchError> {
        if !self.breakers.is_open(primary) {
            return self.dispatch(request, primary).await;
        }

        let mut failures = vec![ModelFailure::new(primary, "circuit open")];

        let Some(fallback) = self.chains.recommended_fallback(primary) else {
            return Err(DispatchError::AllAttemptsFailed {
                primary: primary.to_string(),
                failures,
            });
        };

        warn!(primary, fallback = %fallback, "circuit open, routing to recommended fallback");
        let attempted = vec![primary.to_string(), fallback.clone()];

        let backend = match self.registry.for_model(&fallback) {
            Ok(backend) => backend,
            Err(err) => {
                failures.push(ModelFailure::new(&fallback, err.to_string()));
                return Err(DispatchError::AllAttemptsFailed {
                    primary: primary.to_string(),
                    failures,
                });
            }
        };

        let mut attempt = request;
        attempt.model = fallback.clone();

        match backend.chat(attempt).await {
            Ok(response) => {
                self.breakers.record_success(&fallback);
                Ok(FallbackOutcome {
                    response,
                    fallback_occurred: true,
                    attempted_models: attempted,
                    failure_reasons: failures,
                })
            }
            Err(err) => {
                self.breakers.record_failure(&fallback);
                match ErrorDisposition::from_error(&err) {
                    ErrorDisposition::Fatal => Err(DispatchError::Fatal {
                        model: fallback,
                        attempted_models: attempted,
                        source: err,
                    }),
                    ErrorDisposition::Retryable => {
                        failures.push(ModelFailure::new(&fallback, err.to_string()));
                        Err(DispatchError::AllAttemptsFailed {
                            primary: primary.to_string(),
                            failures,
                        })
                    }
                }
            }
        }
    }
}
