//! Google Gemini Backend (text-only)
//!
//! Implements Gemini via the Generative Language API v1beta, including
//! SSE streaming through `streamGenerateContent`.

use super::provider::{ChatStream, LLMProvider};
use super::types::*;
use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Gemini backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key
    pub api_key: String,
    /// Base URL (default: https://generativelanguage.googleapis.com)
    pub base_url: String,
    /// Default temperature
    pub default_temperature: f32,
    /// Default max output tokens
    pub default_max_tokens: u32,
    /// Request timeout
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            default_temperature: 0.7,
            default_max_tokens: 2048,
            timeout_secs: 60,
        }
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn from_env() -> Self {
        let mut cfg = Self {
            api_key: std::env::var("GEMINI_API_KEY").unwrap_or_default(),
            ..Default::default()
        };

        if let Ok(base_url) = std::env::var("GEMINI_BASE_URL") {
            cfg.base_url = base_url;
        }
        cfg
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.default_max_tokens = tokens;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Gemini backend (text-only, no tools)
pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>) -> LLMResult<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    pub fn from_env() -> LLMResult<Self> {
        Self::with_config(GeminiConfig::from_env())
    }

    pub fn with_config(config: GeminiConfig) -> LLMResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LLMError::ConfigError(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Gemini uses "model" for the assistant role and a top-level
    /// systemInstruction field
    fn convert_messages(messages: &[ChatMessage]) -> (Option<String>, Vec<serde_json::Value>) {
        let mut system_parts = Vec::new();
        let mut contents = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => system_parts.push(msg.content.clone()),
                Role::User | Role::Assistant => {
                    let role = match msg.role {
                        Role::User => "user",
                        Role::Assistant => "model",
                        Role::System => unreachable!(),
                    };

                    contents.push(serde_json::json!({
                        "role": role,
                        "parts": [{"text": msg.content}],
                    }));
                }
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n"))
        };

        (system, contents)
    }

    fn request_body(&self, request: &ChatCompletionRequest) -> serde_json::Value {
        let (system, contents) = Self::convert_messages(&request.messages);

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": {
                "temperature": request
                    .temperature
                    .unwrap_or(self.config.default_temperature),
                "maxOutputTokens": request
                    .max_tokens
                    .unwrap_or(self.config.default_max_tokens),
            }
        });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({"parts": [{"text": sys}]});
        }

        if let Some(tp) = request.top_p {
            body["generationConfig"]["topP"] = serde_json::json!(tp);
        }

        if let Some(stop) = request.stop.clone() {
            body["generationConfig"]["stopSequences"] = serde_json::json!(stop);
        }

        body
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

    fn first_candidate_text(parsed: GeminiResponse) -> Option<String> {
        parsed
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
    }
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "promptTokenCount")]
    prompt_tokens: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_tokens: u32,
    #[serde(rename = "totalTokenCount")]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage: Option<GeminiUsage>,
}

#[async_trait]
impl LLMProvider for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn chat(&self, request: ChatCompletionRequest) -> LLMResult<ChatCompletionResponse> {
        let body = self.request_body(&request);

        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            request.model,
            self.config.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;

        let status = resp.status();
        let text = resp.text().await.map_err(Self::map_error)?;

        if !status.is_success() {
            return Err(Self::map_status(status, text));
        }

        let parsed: GeminiResponse =
            serde_json::from_str(&text).map_err(|e| LLMError::SerializationError(e.to_string()))?;

        let finish_reason = parsed
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .and_then(|r| match r {
                "STOP" => Some(FinishReason::Stop),
                "MAX_TOKENS" => Some(FinishReason::Length),
                "SAFETY" => Some(FinishReason::ContentFilter),
                _ => None,
            });

        let usage = parsed.usage.as_ref().map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.candidates_tokens,
            total_tokens: u.total_tokens,
        });

        let content = Self::first_candidate_text(parsed).unwrap_or_default();

        Ok(ChatCompletionResponse {
            id: String::new(),
            model: request.model,
            provider: "gemini".to_string(),
            content,
            finish_reason,
            usage,
        })
    }

    async fn chat_stream(&self, request: ChatCompletionRequest) -> LLMResult<ChatStream> {
        let body = self.request_body(&request);

        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse&key={}",
            self.config.base_url.trim_end_matches('/'),
            request.model,
            self.config.api_key
        );

        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(Self::map_error)?;
            return Err(Self::map_status(status, text));
        }

        // Parse the SSE byte stream: buffer partial lines across network
        // chunks and emit one text fragment per `data:` event
        let converted = resp
            .bytes_stream()
            .scan(String::new(), |buffer, chunk| {
                let fragments = match chunk {
                    Ok(bytes) => {
                        buffer.push_str(&String::from_utf8_lossy(&bytes));
                        let mut out = Vec::new();
                        while let Some(pos) = buffer.find('\n') {
                            let line = buffer[..pos].trim().to_string();
                            buffer.drain(..=pos);

                            let Some(data) = line.strip_prefix("data: ") else {
                                continue;
                            };
                            if data == "[DONE]" {
                                continue;
                            }
                            match serde_json::from_str::<GeminiResponse>(data) {
                                Ok(parsed) => {
                                    if let Some(text) = Self::first_candidate_text(parsed) {
                                        if !text.is_empty() {
                                            out.push(Ok(text));
                                        }
                                    }
                                }
                                Err(e) => {
                                    out.push(Err(LLMError::SerializationError(e.to_string())));
                                }
                            }
                        }
                        out
                    }
                    Err(e) => vec![Err(Self::map_error(e))],
                };
                futures::future::ready(Some(fragments))
            })
            .flat_map(futures::stream::iter);

        Ok(Box::pin(converted))
    }
}
