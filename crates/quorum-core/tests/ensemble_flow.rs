//! End-to-end orchestration flows against scripted backends.

use async_trait::async_trait;
use futures::StreamExt;
use quorum_core::{
    AiOrchestrator, BackendRegistry, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
    ChatStream, CircuitBreakerConfig, DispatchError, EnsembleRequest, LLMError, LLMProvider,
    LLMResult, OrchestratorConfig, ProviderKind, SelectionMode, Usage,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Per-model scripted behavior
#[derive(Clone)]
enum Behavior {
    Reply { text: &'static str, delay_ms: u64 },
    Fail(LLMError),
    Stream(Vec<&'static str>),
}

/// Stub backend driven by a model-name -> behavior table
struct StubBackend {
    behaviors: HashMap<String, Behavior>,
    calls: AtomicUsize,
}

impl StubBackend {
    fn new(behaviors: impl IntoIterator<Item = (&'static str, Behavior)>) -> Arc<Self> {
        Arc::new(Self {
            behaviors: behaviors
                .into_iter()
                .map(|(model, behavior)| (model.to_string(), behavior))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LLMProvider for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn chat(&self, request: ChatCompletionRequest) -> LLMResult<ChatCompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behaviors.get(&request.model) {
            Some(Behavior::Reply { text, delay_ms }) => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(ChatCompletionResponse {
                    id: format!("stub-{}", request.model),
                    model: request.model,
                    provider: "stub".to_string(),
                    content: text.to_string(),
                    finish_reason: None,
                    usage: Some(Usage {
                        prompt_tokens: 10,
                        completion_tokens: 5,
                        total_tokens: 15,
                    }),
                })
            }
            Some(Behavior::Fail(err)) => Err(err.clone()),
            Some(Behavior::Stream(_)) | None => {
                Err(LLMError::ModelNotFound(request.model.clone()))
            }
        }
    }

    async fn chat_stream(&self, request: ChatCompletionRequest) -> LLMResult<ChatStream> {
        match self.behaviors.get(&request.model) {
            Some(Behavior::Stream(fragments)) => {
                let fragments: Vec<LLMResult<String>> =
                    fragments.iter().map(|f| Ok(f.to_string())).collect();
                Ok(Box::pin(futures::stream::iter(fragments)))
            }
            _ => Err(LLMError::ProviderNotSupported(
                "no stream scripted".to_string(),
            )),
        }
    }
}

fn orchestrator_with(stub: Arc<StubBackend>, config: OrchestratorConfig) -> AiOrchestrator {
    // Make tracing output visible under RUST_LOG; ignore repeat init
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let mut registry = BackendRegistry::new();
    // Slash-qualified stub names all route to the OpenRouter slot
    registry.register(ProviderKind::OpenRouter, stub);
    AiOrchestrator::new(config, registry)
}

#[tokio::test]
async fn best_mode_picks_confident_fast_answer_over_hedged_slow_one() {
    // Model a answers tersely and fast; b hedges and dawdles; c's backend
    // raises a transient error and its chain (just itself, as the global
    // default) exhausts.
    let stub = StubBackend::new([
        (
            "stub/a",
            Behavior::Reply {
                text: "4.",
                delay_ms: 50,
            },
        ),
        (
            "stub/b",
            Behavior::Reply {
                text: "I think maybe around 4?",
                delay_ms: 300,
            },
        ),
        (
            "stub/c",
            Behavior::Fail(LLMError::NetworkError("connection reset".to_string())),
        ),
    ]);

    let config = OrchestratorConfig::new().with_default_model("stub/c");
    let orchestrator = orchestrator_with(stub, config);

    let request = EnsembleRequest::from_prompt("What is 2+2?")
        .with_mode(SelectionMode::Best)
        .with_models(["stub/a", "stub/b", "stub/c"]);

    let result = orchestrator.run_ensemble(request).await.unwrap();

    // Only the two successes survive, in requested order
    let models: Vec<&str> = result
        .all_responses
        .iter()
        .map(|r| r.model.as_str())
        .collect();
    assert_eq!(models, vec!["stub/a", "stub/b"]);

    assert!(result.all_responses[0].score > result.all_responses[1].score);
    assert_eq!(result.selected_model, "stub/a");
    assert_eq!(result.best_response_text, "4.");

    // The failed model is still visible in provenance
    assert!(result.attempted_models.contains(&"stub/c".to_string()));
    assert!(
        result
            .failure_reasons
            .iter()
            .any(|f| f.model == "stub/c")
    );
}

#[tokio::test]
async fn ensemble_fails_only_when_every_model_fails() {
    let stub = StubBackend::new([
        (
            "stub/a",
            Behavior::Fail(LLMError::RateLimited("throttled".to_string())),
        ),
        (
            "stub/b",
            Behavior::Fail(LLMError::NetworkError("down".to_string())),
        ),
    ]);

    let config = OrchestratorConfig::new().with_default_model("stub/b");
    let orchestrator = orchestrator_with(stub, config);

    let request = EnsembleRequest::from_prompt("anything").with_models(["stub/a", "stub/b"]);
    let err = orchestrator.run_ensemble(request).await.unwrap_err();
    assert!(err.to_string().contains("failed"));
}

#[tokio::test]
async fn consensus_mode_runs_arbiter_through_dispatch() {
    let stub = StubBackend::new([
        (
            "stub/a",
            Behavior::Reply {
                text: "Paris is the capital of France.",
                delay_ms: 10,
            },
        ),
        (
            "stub/b",
            Behavior::Reply {
                text: "The capital of France is Paris.",
                delay_ms: 10,
            },
        ),
        (
            "stub/judge",
            Behavior::Reply {
                text: "Both answers agree: Paris.",
                delay_ms: 10,
            },
        ),
    ]);

    let config = OrchestratorConfig::new()
        .with_default_model("stub/a")
        .with_arbiter_model("stub/judge");
    let orchestrator = orchestrator_with(stub, config);

    let request = EnsembleRequest::from_prompt("What is the capital of France?")
        .with_mode(SelectionMode::Consensus)
        .with_models(["stub/a", "stub/b"]);

    let result = orchestrator.run_ensemble(request).await.unwrap();
    assert_eq!(result.selected_model, "stub/judge");
    assert_eq!(result.best_response_text, "Both answers agree: Paris.");
    assert!(result.confidence_score <= 100.0);
    assert!(result.reasoning.contains("Consensus"));
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures_and_recovers() {
    let stub = StubBackend::new([(
        "stub/flaky",
        Behavior::Fail(LLMError::ApiError {
            code: Some("500".to_string()),
            message: "internal".to_string(),
        }),
    )]);

    let breaker = CircuitBreakerConfig::new()
        .with_failure_threshold(2)
        .with_reset_window(Duration::from_millis(200));
    let config = OrchestratorConfig::new()
        .with_default_model("stub/flaky")
        .with_circuit_breaker(breaker);
    let orchestrator = orchestrator_with(stub.clone(), config);

    let request = || ChatCompletionRequest::new("stub/flaky").user("hi");

    // Two failing dispatches reach the threshold
    for _ in 0..2 {
        let err = orchestrator
            .dispatch(request(), "stub/flaky")
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::AllAttemptsFailed { .. }));
    }
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);

    // Third dispatch is blocked by the open circuit without a backend call
    let err = orchestrator
        .dispatch(request(), "stub/flaky")
        .await
        .unwrap_err();
    assert_eq!(err.failures()[0].reason, "circuit open");
    assert_eq!(stub.calls.load(Ordering::SeqCst), 2);

    // After the reset window the model is probed again
    tokio::time::sleep(Duration::from_millis(250)).await;
    let _ = orchestrator.dispatch(request(), "stub/flaky").await;
    assert_eq!(stub.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn open_primary_routes_to_single_recommended_fallback() {
    let stub = StubBackend::new([
        (
            "stub/primary",
            Behavior::Fail(LLMError::Timeout("slow".to_string())),
        ),
        (
            "stub/backup",
            Behavior::Reply {
                text: "backup answer",
                delay_ms: 10,
            },
        ),
    ]);

    let breaker = CircuitBreakerConfig::new()
        .with_failure_threshold(1)
        .with_reset_window(Duration::from_secs(60));
    let config = OrchestratorConfig::new()
        .with_default_model("stub/backup")
        .with_circuit_breaker(breaker)
        .with_fallback_chain("stub/primary", ["stub/backup", "stub/other"]);
    let orchestrator = orchestrator_with(stub.clone(), config);

    // Open the primary's circuit
    let _ = orchestrator
        .dispatch(
            ChatCompletionRequest::new("stub/primary").user("hi"),
            "stub/primary",
        )
        .await;

    let calls_before = stub.calls.load(Ordering::SeqCst);
    let outcome = orchestrator
        .dispatch_with_breaker(
            ChatCompletionRequest::new("stub/primary").user("hi"),
            "stub/primary",
        )
        .await
        .unwrap();

    assert!(outcome.fallback_occurred);
    assert_eq!(outcome.response.model, "stub/backup");
    assert_eq!(
        outcome.attempted_models,
        vec!["stub/primary", "stub/backup"]
    );
    // Exactly one backend call: the recommended fallback, not the chain
    assert_eq!(stub.calls.load(Ordering::SeqCst), calls_before + 1);
}

#[tokio::test]
async fn auth_failure_stops_the_whole_chain() {
    let stub = StubBackend::new([
        (
            "stub/locked",
            Behavior::Fail(LLMError::AuthError("invalid api key".to_string())),
        ),
        (
            "stub/backup",
            Behavior::Reply {
                text: "should never be reached",
                delay_ms: 10,
            },
        ),
    ]);

    let config = OrchestratorConfig::new()
        .with_default_model("stub/backup")
        .with_fallback_chain("stub/locked", ["stub/backup"]);
    let orchestrator = orchestrator_with(stub.clone(), config);

    let err = orchestrator
        .dispatch(
            ChatCompletionRequest::new("stub/locked").user("hi"),
            "stub/locked",
        )
        .await
        .unwrap_err();

    match err {
        DispatchError::Fatal {
            attempted_models, ..
        } => assert_eq!(attempted_models, vec!["stub/locked"]),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn streaming_uses_the_fixed_stream_model_regardless_of_mode() {
    let stub = StubBackend::new([(
        "stub/fast",
        Behavior::Stream(vec!["Hel", "lo ", "world"]),
    )]);

    let config = OrchestratorConfig::new().with_stream_model("stub/fast");
    let orchestrator = orchestrator_with(stub, config);

    let request = EnsembleRequest::from_prompt("say hello")
        .with_mode(SelectionMode::Synthesize)
        .with_models(["stub/a", "stub/b"]);

    let mut stream = orchestrator.stream_ensemble(request).await.unwrap();
    let mut collected = String::new();
    while let Some(fragment) = stream.next().await {
        collected.push_str(&fragment.unwrap());
    }
    assert_eq!(collected, "Hello world");
}

#[tokio::test]
async fn ensemble_keeps_multi_turn_context() {
    let stub = StubBackend::new([(
        "stub/a",
        Behavior::Reply {
            text: "It was Paris, as established.",
            delay_ms: 10,
        },
    )]);

    let config = OrchestratorConfig::new().with_default_model("stub/a");
    let orchestrator = orchestrator_with(stub, config);

    let request = EnsembleRequest::default()
        .with_system("Answer briefly.")
        .message(ChatMessage::user("What is the capital of France?"))
        .message(ChatMessage::assistant("Paris."))
        .message(ChatMessage::user("What city did you just name?"))
        .with_models(["stub/a"]);

    let result = orchestrator.run_ensemble(request).await.unwrap();
    assert_eq!(result.all_responses.len(), 1);
    assert_eq!(result.best_response_text, "It was Paris, as established.");
}
