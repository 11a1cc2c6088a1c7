//! OpenRouter Backend
//!
//! OpenRouter speaks the OpenAI chat-completions wire format and fronts
//! many vendors behind `vendor/model` names. It is also the catch-all
//! route for model names no dedicated backend claims.

use super::provider::LLMProvider;
use super::types::*;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// API key
    pub api_key: String,
    /// Base URL (default: https://openrouter.ai/api/v1)
    pub base_url: String,
    /// Optional HTTP-Referer attribution header
    pub referer: Option<String>,
    /// Optional X-Title attribution header
    pub title: Option<String>,
    /// Default temperature
    pub default_temperature: f32,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            referer: None,
            title: None,
            default_temperature: 0.7,
            timeout_secs: 60,
        }
    }
}

impl OpenRouterConfig {
    /// Create config from API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Build from environment variables
    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            ..Default::default()
        };

        if let Ok(base_url) = std::env::var("OPENROUTER_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// OpenRouter backend
pub struct OpenRouterBackend {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterBackend {
    pub fn new(api_key: impl Into<String>) -> LLMResult<Self> {
        Self::with_config(OpenRouterConfig::new(api_key))
    }

    pub fn from_env() -> LLMResult<Self> {
        Self::with_config(OpenRouterConfig::from_env())
    }

    pub fn with_config(config: OpenRouterConfig) -> LLMResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn map_error(err: reqwest::Error) -> LLMError {
        if err.is_timeout() {
            LLMError::Timeout(err.to_string())
        } else if err.is_connect() || err.is_request() {
            LLMError::NetworkError(err.to_string())
        } else {
            LLMError::Other(err.to_string())
        }
    }

    fn map_status(status: reqwest::StatusCode, body: String) -> LLMError {
        match status.as_u16() {
            401 | 403 => LLMError::AuthError(body),
            404 => LLMError::ModelNotFound(body),
            429 => LLMError::RateLimited(body),
            _ => LLMError::ApiError {
                code: Some(status.as_u16().to_string()),
                message: body,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    id: String,
    model: String,
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[async_trait]
impl LLMProvider for OpenRouterBackend {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn chat(&self, request: ChatCompletionRequest) -> LLMResult<ChatCompletionResponse> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut body = serde_json::to_value(&request)
            .map_err(|e| LLMError::SerializationError(e.to_string()))?;
        if request.temperature.is_none() {
            body["temperature"] = serde_json::json!(self.config.default_temperature);
        }

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key));

        if let Some(ref referer) = self.config.referer {
            req = req.header("HTTP-Referer", referer);
        }
        if let Some(ref title) = self.config.title {
            req = req.header("X-Title", title);
        }

        let resp = req.json(&body).send().await.map_err(Self::map_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Self::map_error)?;

        if !status.is_success() {
            return Err(Self::map_status(status, text));
        }

        let parsed: OpenRouterResponse =
            serde_json::from_str(&text).map_err(|e| LLMError::SerializationError(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::ApiError {
                code: None,
                message: "response contained no choices".to_string(),
            })?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("stop") => Some(FinishReason::Stop),
            Some("length") => Some(FinishReason::Length),
            Some("content_filter") => Some(FinishReason::ContentFilter),
            _ => None,
        };

        let usage = parsed.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ChatCompletionResponse {
            id: parsed.id,
            model: parsed.model,
            provider: "openrouter".to_string(),
            content: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage,
        })
    }
}
