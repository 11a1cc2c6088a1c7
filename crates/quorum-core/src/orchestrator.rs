//! 编排器门面
//! Orchestrator facade
//!
//! 将后端注册表、回退路由、熔断器和集成协调器组装为一个入口
//! Assembles the backend registry, fallback router, circuit breakers and
//! ensemble coordinator behind a single entry point.

use crate::circuit_breaker::CircuitBreakerMap;
use crate::config::OrchestratorConfig;
use crate::ensemble::{
    EnsembleCoordinator, EnsembleError, EnsembleRequest, EnsembleResult, HeuristicScorer,
};
use crate::fallback::{DispatchError, FallbackOutcome, FallbackRouter};
use crate::llm::anthropic::AnthropicBackend;
use crate::llm::gemini::GeminiBackend;
use crate::llm::openai::OpenAIBackend;
use crate::llm::openrouter::OpenRouterBackend;
use crate::llm::provider::{BackendRegistry, ChatStream, ProviderKind};
use crate::llm::types::{ChatCompletionRequest, LLMResult};
use std::sync::Arc;
use tracing::info;

/// 多模型编排器
/// Multi-model orchestrator
///
/// 所有公共入口：单模型回退调度、熔断感知调度、集成运行与流式输出
/// All public entry points: single-model fallback dispatch, breaker-aware
/// dispatch, ensemble runs, and streaming.
pub struct AiOrchestrator {
    router: Arc<FallbackRouter>,
    coordinator: EnsembleCoordinator,
    config: OrchestratorConfig,
}

impl AiOrchestrator {
    /// 使用配置和后端注册表创建编排器
    /// Create an orchestrator from a configuration and backend registry
    pub fn new(config: OrchestratorConfig, registry: BackendRegistry) -> Self {
        let breakers = Arc::new(CircuitBreakerMap::new(config.circuit_breaker.clone()));
        let router = Arc::new(FallbackRouter::new(registry, breakers, config.chains()));
        let coordinator = EnsembleCoordinator::new(
            Arc::clone(&router),
            Arc::new(HeuristicScorer::new()),
            config.clone(),
        );

        Self {
            router,
            coordinator,
            config,
        }
    }

    /// 从环境变量创建编排器，注册所有能找到凭证的后端
    /// Create an orchestrator from environment variables, registering every
    /// backend for which a credential is present
    pub fn from_env(config: OrchestratorConfig) -> LLMResult<Self> {
        let mut registry = BackendRegistry::new();

        if std::env::var("OPENAI_API_KEY").is_ok() {
            registry.register(ProviderKind::OpenAI, Arc::new(OpenAIBackend::from_env()));
        }
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            registry.register(
                ProviderKind::Anthropic,
                Arc::new(AnthropicBackend::from_env()?),
            );
        }
        if std::env::var("GEMINI_API_KEY").is_ok() {
            registry.register(ProviderKind::Gemini, Arc::new(GeminiBackend::from_env()?));
        }
        if std::env::var("OPENROUTER_API_KEY").is_ok() {
            registry.register(
                ProviderKind::OpenRouter,
                Arc::new(OpenRouterBackend::from_env()?),
            );
        }

        info!(backends = registry.len(), "orchestrator initialized from environment");
        Ok(Self::new(config, registry))
    }

    /// 配置
    /// The active configuration
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// 回退路由器
    /// The fallback router
    pub fn router(&self) -> &Arc<FallbackRouter> {
        &self.router
    }

    /// 单模型调度（带回退链）
    /// Single-model dispatch with fallback chain resilience
    pub async fn dispatch(
        &self,
        request: ChatCompletionRequest,
        primary: &str,
    ) -> Result<FallbackOutcome, DispatchError> {
        self.router.dispatch(request, primary).await
    }

    /// 熔断感知调度：主模型熔断时直达推荐回退模型
    /// Breaker-aware dispatch: an open primary routes straight to its
    /// recommended fallback
    pub async fn dispatch_with_breaker(
        &self,
        request: ChatCompletionRequest,
        primary: &str,
    ) -> Result<FallbackOutcome, DispatchError> {
        self.router.dispatch_with_breaker(request, primary).await
    }

    /// 运行多模型集成
    /// Run a multi-model ensemble
    pub async fn run_ensemble(
        &self,
        request: EnsembleRequest,
    ) -> Result<EnsembleResult, EnsembleError> {
        self.coordinator.run(request).await
    }

    /// 流式集成（单一低延迟模型）
    /// Stream an ensemble request (single low-latency model)
    pub async fn stream_ensemble(&self, request: EnsembleRequest) -> LLMResult<ChatStream> {
        self.coordinator.stream(request).await
    }

    /// 便捷方法：用默认模型问一个问题
    /// Convenience: ask the default model one question
    pub async fn ask(&self, prompt: impl Into<String>) -> Result<String, DispatchError> {
        let primary = self.config.default_model.clone();
        let request = ChatCompletionRequest::new(&primary).user(prompt);
        let outcome = self.dispatch(request, &primary).await?;
        Ok(outcome.response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::LLMProvider;
    use crate::llm::types::{ChatCompletionResponse, LLMError};
    use async_trait::async_trait;

    struct EchoBackend;

    #[async_trait]
    impl LLMProvider for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(
            &self,
            request: ChatCompletionRequest,
        ) -> LLMResult<ChatCompletionResponse> {
            let content = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .ok_or_else(|| LLMError::Other("empty request".to_string()))?;
            Ok(ChatCompletionResponse {
                id: "echo-1".to_string(),
                model: request.model,
                provider: "echo".to_string(),
                content,
                finish_reason: None,
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_ask_uses_default_model() {
        let config = OrchestratorConfig::new().with_default_model("local/echo");
        let mut registry = BackendRegistry::new();
        registry.register(ProviderKind::OpenRouter, Arc::new(EchoBackend));

        let orchestrator = AiOrchestrator::new(config, registry);
        let answer = orchestrator.ask("ping").await.unwrap();
        assert_eq!(answer, "ping");
    }
}
