//! LLM 提供商抽象
//! LLM provider abstraction
//!
//! 定义所有后端实现的统一 trait，以及模型名到后端的路由
//! Defines the unified trait implemented by all backends, plus model-name
//! to backend routing

use crate::llm::types::{ChatCompletionRequest, ChatCompletionResponse, LLMError, LLMResult};
use async_trait::async_trait;
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

/// 流式响应类型（文本片段流）
/// Streaming response type (a stream of text fragments)
pub type ChatStream = Pin<Box<dyn Stream<Item = LLMResult<String>> + Send>>;

/// LLM 提供商 trait
/// LLM provider trait
///
/// 所有 LLM 后端（OpenAI、Anthropic、Gemini、OpenRouter）都实现此 trait
/// All LLM backends (OpenAI, Anthropic, Gemini, OpenRouter) implement this trait
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提供商名称
    /// Provider name
    fn name(&self) -> &str;

    /// 默认模型
    /// Default model
    fn default_model(&self) -> &str {
        ""
    }

    /// 支持的模型列表（空列表表示不限制）
    /// List of supported models (empty means unrestricted)
    fn supported_models(&self) -> Vec<&str> {
        vec![]
    }

    /// 是否支持某个模型
    /// Whether a model is supported
    fn supports_model(&self, model: &str) -> bool {
        let models = self.supported_models();
        models.is_empty() || models.contains(&model)
    }

    /// 发送聊天完成请求
    /// Send a chat completion request
    async fn chat(&self, request: ChatCompletionRequest) -> LLMResult<ChatCompletionResponse>;

    /// 发送流式聊天完成请求
    /// Send a streaming chat completion request
    async fn chat_stream(&self, request: ChatCompletionRequest) -> LLMResult<ChatStream> {
        let _ = request;
        Err(LLMError::ProviderNotSupported(format!(
            "{} does not support streaming",
            self.name()
        )))
    }
}

/// 提供商类别
/// Provider kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Gemini,
    OpenRouter,
}

impl ProviderKind {
    /// 根据模型名称推断提供商
    /// Infer the provider from a model name
    ///
    /// 规则 / Rules:
    /// - `gpt-*`, `o1*`, `o3*`, `chatgpt-*` -> OpenAI
    /// - `claude-*` -> Anthropic
    /// - `gemini-*` -> Gemini
    /// - 其它（包括带 `/` 的组合名）-> OpenRouter
    ///   anything else (including `vendor/model` names) -> OpenRouter
    pub fn for_model(model: &str) -> Self {
        if model.contains('/') {
            return Self::OpenRouter;
        }
        if model.starts_with("gpt-")
            || model.starts_with("o1")
            || model.starts_with("o3")
            || model.starts_with("chatgpt-")
        {
            Self::OpenAI
        } else if model.starts_with("claude-") {
            Self::Anthropic
        } else if model.starts_with("gemini-") {
            Self::Gemini
        } else {
            Self::OpenRouter
        }
    }

    /// 提供商标识字符串
    /// Provider identifier string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::OpenRouter => "openrouter",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 后端注册表
/// Backend registry
///
/// 将提供商类别映射到具体后端实例，路由由模型名前缀决定
/// Maps provider kinds to concrete backend instances; routing is decided
/// by model-name prefix
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: HashMap<ProviderKind, Arc<dyn LLMProvider>>,
}

impl BackendRegistry {
    /// 创建空注册表
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册后端
    /// Register a backend
    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn LLMProvider>) {
        self.backends.insert(kind, provider);
    }

    /// 链式注册后端
    /// Register a backend (builder style)
    pub fn with_backend(mut self, kind: ProviderKind, provider: Arc<dyn LLMProvider>) -> Self {
        self.register(kind, provider);
        self
    }

    /// 获取指定类别的后端
    /// Get the backend for a kind
    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn LLMProvider>> {
        self.backends.get(&kind).cloned()
    }

    /// 根据模型名称解析后端
    /// Resolve the backend for a model name
    pub fn for_model(&self, model: &str) -> LLMResult<Arc<dyn LLMProvider>> {
        let kind = ProviderKind::for_model(model);
        self.get(kind).ok_or_else(|| {
            LLMError::ProviderNotSupported(format!(
                "no backend registered for provider '{kind}' (model '{model}')"
            ))
        })
    }

    /// 已注册的后端数量
    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// 是否为空
    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
