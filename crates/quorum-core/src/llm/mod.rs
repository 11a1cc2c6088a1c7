//! LLM 后端抽象层
//! LLM backend abstraction layer
//!
//! 提供统一的多提供商 LLM 访问接口，是编排层（回退路由、集成协调）
//! 之下的最底层
//! Provides a unified multi-provider LLM access interface; this is the
//! lowest layer beneath the orchestration pieces (fallback routing,
//! ensemble coordination)
//!
//! # 架构
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------+
//! |            FallbackRouter / EnsembleCoordinator        |
//! +--------------------------------------------------------+
//! |                    BackendRegistry                     |
//! |        (model name prefix -> ProviderKind)             |
//! +------------+------------+-------------+----------------+
//! |  OpenAI    | Anthropic  |   Gemini    |  OpenRouter    |
//! | (async-    | (reqwest)  |  (reqwest)  |  (reqwest)     |
//! |  openai)   |            |             |                |
//! +------------+------------+-------------+----------------+
//! ```
//!
//! # 支持的提供商
//! # Supported Providers
//!
//! - **OpenAI**: GPT-4o, o1/o3 系列，及兼容 API (Ollama, vLLM 等)
//! - **Anthropic**: Claude 3+ (Messages API)
//! - **Gemini**: Google Generative Language API (含 SSE 流式)
//! - **OpenRouter**: 多厂商聚合，`vendor/model` 名称的兜底路由
//!   multi-vendor aggregation, catch-all for `vendor/model` names

pub mod anthropic;
pub mod gemini;
pub mod openai;
pub mod openrouter;
pub mod pricing;
pub mod provider;
pub mod types;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use openai::{OpenAIBackend, OpenAIBackendConfig};
pub use openrouter::{OpenRouterBackend, OpenRouterConfig};
pub use pricing::estimate_cost;
pub use provider::{BackendRegistry, ChatStream, LLMProvider, ProviderKind};
pub use types::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, ErrorDisposition, FinishReason,
    LLMError, LLMResult, Role, Usage,
};
