//! LLM 核心类型定义
//! Core LLM type definitions
//!
//! 定义与 LLM 后端交互所需的所有类型
//! Defines all types required for interacting with LLM backends

use serde::{Deserialize, Serialize};

// ============================================================================
// 消息类型
// Message Types
// ============================================================================

/// 消息角色
/// Message Role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// 系统消息（设置 LLM 行为）
    /// System message (configures LLM behavior)
    System,
    /// 用户消息
    /// User message
    #[default]
    User,
    /// 助手（LLM）响应
    /// Assistant (LLM) response
    Assistant,
}

/// 聊天消息
/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 消息角色
    /// Message role
    pub role: Role,
    /// 消息内容
    /// Message content
    pub content: String,
}

impl ChatMessage {
    /// 创建系统消息
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// 创建用户消息
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// 创建助手消息
    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// 请求和响应
// Request and Response
// ============================================================================

/// Chat Completion 请求
/// Chat Completion Request
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatCompletionRequest {
    /// 模型名称
    /// Model name
    pub model: String,
    /// 消息列表
    /// Message list
    pub messages: Vec<ChatMessage>,
    /// 温度参数 (0.0 - 2.0)
    /// Temperature parameter (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// 生成的最大 token 数
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Top-p 采样
    /// Top-p sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// 停止序列
    /// Stop sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// 是否流式输出
    /// Whether to stream the output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

impl ChatCompletionRequest {
    /// 创建新请求
    /// Create a new request
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    /// 添加消息
    /// Add a message
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// 添加系统消息
    /// Add a system message
    pub fn system(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::system(content));
        self
    }

    /// 添加用户消息
    /// Add a user message
    pub fn user(mut self, content: impl Into<String>) -> Self {
        self.messages.push(ChatMessage::user(content));
        self
    }

    /// 设置温度
    /// Set temperature
    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// 设置最大 token 数
    /// Set maximum tokens
    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    /// 最后一条用户消息的内容（用于响应评分）
    /// Content of the last user message (used for response scoring)
    pub fn last_user_content(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// 完成原因
/// Finish reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// 正常完成
    /// Completed normally
    Stop,
    /// 达到长度限制
    /// Length limit reached
    Length,
    /// 内容过滤
    /// Content filtered
    ContentFilter,
}

/// Token 使用统计
/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// 提示 token 数
    /// Prompt tokens
    pub prompt_tokens: u32,
    /// 完成 token 数
    /// Completion tokens
    pub completion_tokens: u32,
    /// 总 token 数
    /// Total tokens
    pub total_tokens: u32,
}

/// Chat Completion 响应
/// Chat Completion response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// 响应 ID
    /// Response ID
    pub id: String,
    /// 实际应答的模型名称
    /// Name of the model that actually answered
    pub model: String,
    /// 提供商标识
    /// Provider identifier
    pub provider: String,
    /// 响应文本
    /// Response text
    pub content: String,
    /// 完成原因
    /// Finish reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    /// 使用统计
    /// Usage statistics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

// ============================================================================
// 错误类型
// Error Types
// ============================================================================

/// LLM 错误
/// LLM error
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    /// API 错误
    /// API error
    #[error("API error: {message} (code: {code:?})")]
    ApiError {
        code: Option<String>,
        message: String,
    },
    /// 认证错误
    /// Authentication error
    #[error("Authentication failed: {0}")]
    AuthError(String),
    /// 速率限制
    /// Rate limit exceeded
    #[error("Rate limited: {0}")]
    RateLimited(String),
    /// 模型不存在
    /// Model not found
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    /// 网络错误
    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),
    /// 超时
    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),
    /// 序列化错误
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
    /// 配置错误
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// 提供商不支持
    /// Provider not supported
    #[error("Provider not supported: {0}")]
    ProviderNotSupported(String),
    /// 其他错误
    /// Other error
    #[error("LLM error: {0}")]
    Other(String),
}

/// LLM 结果类型
/// LLM result type
pub type LLMResult<T> = Result<T, LLMError>;

// ============================================================================
// Error Disposition (fallback chain behavior)
// ============================================================================

/// How a backend error affects an in-flight fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Abort the entire chain immediately (bad credentials cannot be fixed
    /// by trying another model on the same account).
    Fatal,
    /// Advance to the next candidate in the chain.
    Retryable,
}

impl ErrorDisposition {
    /// Classify an error for the fallback router.
    pub fn from_error(error: &LLMError) -> Self {
        match error {
            LLMError::AuthError(_) => Self::Fatal,
            // Unknown models, rate limits, 5xx, network failures: the next
            // candidate in the chain may still succeed.
            LLMError::ApiError { .. }
            | LLMError::RateLimited(_)
            | LLMError::ModelNotFound(_)
            | LLMError::NetworkError(_)
            | LLMError::Timeout(_)
            | LLMError::SerializationError(_)
            | LLMError::ConfigError(_)
            | LLMError::ProviderNotSupported(_)
            | LLMError::Other(_) => Self::Retryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = ChatCompletionRequest::new("gpt-4o-mini")
            .system("You are a helpful assistant.")
            .user("Hello!")
            .temperature(0.5)
            .max_tokens(256);

        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.temperature, Some(0.5));
        assert_eq!(request.max_tokens, Some(256));
    }

    #[test]
    fn test_last_user_content() {
        let request = ChatCompletionRequest::new("gpt-4o-mini")
            .system("sys")
            .user("first")
            .message(ChatMessage::assistant("answer"))
            .user("second");

        assert_eq!(request.last_user_content(), Some("second"));

        let empty = ChatCompletionRequest::new("gpt-4o-mini").system("sys");
        assert_eq!(empty.last_user_content(), None);
    }

    #[test]
    fn test_error_disposition() {
        let auth = LLMError::AuthError("bad key".to_string());
        assert_eq!(ErrorDisposition::from_error(&auth), ErrorDisposition::Fatal);

        let not_found = LLMError::ModelNotFound("gpt-9".to_string());
        assert_eq!(
            ErrorDisposition::from_error(&not_found),
            ErrorDisposition::Retryable
        );

        let rate = LLMError::RateLimited("slow down".to_string());
        assert_eq!(
            ErrorDisposition::from_error(&rate),
            ErrorDisposition::Retryable
        );

        let server = LLMError::ApiError {
            code: Some("500".to_string()),
            message: "internal".to_string(),
        };
        assert_eq!(
            ErrorDisposition::from_error(&server),
            ErrorDisposition::Retryable
        );
    }
}
