//! OpenAI Provider Implementation
//!
//! 使用 `async-openai` crate 实现 OpenAI API 交互
//! Use the `async-openai` crate to implement OpenAI API interactions
//!
//! # 支持的服务
//! # Supported Services
//!
//! - OpenAI API (api.openai.com)
//! - 兼容 OpenAI API 的本地服务 (Ollama, vLLM, LocalAI 等)
//! - OpenAI-compatible local services (Ollama, vLLM, LocalAI, etc.)
//!
//! # 示例
//! # Examples
//!
//! ```rust,ignore
//! use quorum_core::llm::openai::{OpenAIBackend, OpenAIBackendConfig};
//!
//! // 使用 OpenAI
//! // Use OpenAI
//! let backend = OpenAIBackend::new("sk-xxx");
//!
//! // 使用自定义 endpoint
//! // Use custom endpoint
//! let backend = OpenAIBackend::with_config(
//!     OpenAIBackendConfig::new("sk-xxx")
//!         .with_base_url("http://localhost:11434/v1")
//! );
//! ```

use super::provider::{ChatStream, LLMProvider};
use super::types::*;
use async_openai::{
    Client,
    config::OpenAIConfig as AsyncOpenAIConfig,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use futures::StreamExt;

/// OpenAI 后端配置
/// OpenAI backend configuration
#[derive(Debug, Clone)]
pub struct OpenAIBackendConfig {
    /// API Key
    pub api_key: String,
    /// API 基础 URL
    /// API base URL
    pub base_url: Option<String>,
    /// 组织 ID
    /// Organization ID
    pub org_id: Option<String>,
    /// 默认温度
    /// Default temperature
    pub default_temperature: f32,
}

impl Default for OpenAIBackendConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: None,
            org_id: None,
            default_temperature: 0.7,
        }
    }
}

impl OpenAIBackendConfig {
    /// 创建新配置
    /// Create new configuration
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// 从环境变量创建配置
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
            ..Default::default()
        }
    }

    /// 设置 base URL
    /// Set base URL
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// 设置组织 ID
    /// Set organization ID
    pub fn with_org_id(mut self, org_id: impl Into<String>) -> Self {
        self.org_id = Some(org_id.into());
        self
    }

    /// 设置默认温度
    /// Set default temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.default_temperature = temp;
        self
    }
}

/// OpenAI LLM 后端
/// OpenAI LLM backend
///
/// 支持 OpenAI API 及兼容服务
/// Supports OpenAI API and compatible services
pub struct OpenAIBackend {
    client: Client<AsyncOpenAIConfig>,
    config: OpenAIBackendConfig,
}

impl OpenAIBackend {
    /// 使用 API Key 创建后端
    /// Create backend using API Key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(OpenAIBackendConfig::new(api_key))
    }

    /// 从环境变量创建后端
    /// Create backend from environment variables
    pub fn from_env() -> Self {
        Self::with_config(OpenAIBackendConfig::from_env())
    }

    /// 使用配置创建后端
    /// Create backend using configuration
    pub fn with_config(config: OpenAIBackendConfig) -> Self {
        let mut openai_config = AsyncOpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        if let Some(ref org_id) = config.org_id {
            openai_config = openai_config.with_org_id(org_id);
        }

        let client = Client::with_config(openai_config);

        Self { client, config }
    }

    /// 转换消息格式
    /// Convert message format
    fn convert_messages(
        messages: &[ChatMessage],
    ) -> Result<Vec<ChatCompletionRequestMessage>, LLMError> {
        messages
            .iter()
            .map(|msg| match msg.role {
                Role::System => Ok(ChatCompletionRequestSystemMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(|e| LLMError::Other(e.to_string()))?
                    .into()),
                Role::User => Ok(ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(|e| LLMError::Other(e.to_string()))?
                    .into()),
                Role::Assistant => Ok(ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map_err(|e| LLMError::Other(e.to_string()))?
                    .into()),
            })
            .collect()
    }

    /// 转换响应
    /// Convert response
    fn convert_response(
        response: async_openai::types::CreateChatCompletionResponse,
    ) -> LLMResult<ChatCompletionResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ApiError {
                code: None,
                message: "response contained no choices".to_string(),
            })?;

        let finish_reason = choice.finish_reason.map(|r| match r {
            async_openai::types::FinishReason::Stop => FinishReason::Stop,
            async_openai::types::FinishReason::Length => FinishReason::Length,
            async_openai::types::FinishReason::ContentFilter => FinishReason::ContentFilter,
            // Tool plumbing is not exposed here; treat as a normal stop
            async_openai::types::FinishReason::ToolCalls
            | async_openai::types::FinishReason::FunctionCall => FinishReason::Stop,
        });

        let usage = response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatCompletionResponse {
            id: response.id,
            model: response.model,
            provider: "openai".to_string(),
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage,
        })
    }

    /// 转换错误
    /// Convert error
    fn convert_error(err: async_openai::error::OpenAIError) -> LLMError {
        match err {
            async_openai::error::OpenAIError::ApiError(api_err) => {
                let code = api_err.code.clone();
                let message = api_err.message.clone();

                // 根据错误类型分类
                // Categorize by error type
                if message.contains("rate limit") {
                    LLMError::RateLimited(message)
                } else if message.contains("API key") || message.contains("authentication") {
                    LLMError::AuthError(message)
                } else if message.contains("model") && message.contains("not found") {
                    LLMError::ModelNotFound(message)
                } else {
                    LLMError::ApiError { code, message }
                }
            }
            async_openai::error::OpenAIError::Reqwest(e) => {
                if e.is_timeout() {
                    LLMError::Timeout(e.to_string())
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            }
            async_openai::error::OpenAIError::InvalidArgument(msg) => LLMError::ConfigError(msg),
            _ => LLMError::Other(err.to_string()),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIBackend {
    fn name(&self) -> &str {
        "openai"
    }

    async fn chat(&self, request: ChatCompletionRequest) -> LLMResult<ChatCompletionResponse> {
        let messages = Self::convert_messages(&request.messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&request.model).messages(messages);

        // 设置可选参数
        // Set optional parameters
        if let Some(temp) = request.temperature {
            builder.temperature(temp);
        } else {
            builder.temperature(self.config.default_temperature);
        }

        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }

        if let Some(top_p) = request.top_p {
            builder.top_p(top_p);
        }

        if let Some(ref stop) = request.stop {
            builder.stop(stop.clone());
        }

        let openai_request = builder
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(Self::convert_error)?;

        Self::convert_response(response)
    }

    async fn chat_stream(&self, request: ChatCompletionRequest) -> LLMResult<ChatStream> {
        let messages = Self::convert_messages(&request.messages)?;

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder.model(&request.model).messages(messages).stream(true);

        if let Some(temp) = request.temperature {
            builder.temperature(temp);
        }

        if let Some(max_tokens) = request.max_tokens {
            builder.max_tokens(max_tokens);
        }

        let openai_request = builder
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        let stream = self
            .client
            .chat()
            .create_stream(openai_request)
            .await
            .map_err(Self::convert_error)?;

        // 转换为文本片段流，过滤空 delta
        // Convert to a stream of text fragments, filtering empty deltas
        let converted = stream.filter_map(|result| async move {
            match result {
                Ok(chunk) => chunk
                    .choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.delta.content)
                    .filter(|s| !s.is_empty())
                    .map(Ok),
                Err(e) => Some(Err(Self::convert_error(e))),
            }
        });

        Ok(Box::pin(converted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAIBackendConfig::new("sk-test")
            .with_base_url("http://localhost:8080")
            .with_temperature(0.5);

        assert_eq!(config.api_key, "sk-test");
        assert_eq!(config.base_url, Some("http://localhost:8080".to_string()));
        assert_eq!(config.default_temperature, 0.5);
    }

    #[test]
    fn test_backend_name() {
        let backend = OpenAIBackend::new("test-key");
        assert_eq!(backend.name(), "openai");
    }
}
