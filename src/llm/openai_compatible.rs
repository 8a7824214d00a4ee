//! OpenAI-compatible HTTP client
//!
//! Talks to any endpoint exposing `/v1/chat/completions` (Groq, OpenAI, Ollama,
//! LM Studio). Unlike the genai-backed client it forwards the request `seed`,
//! which is why it is the default for the structured-extraction stages.

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub const GROQ_ENDPOINT: &str = "https://api.groq.com/openai";
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com";
pub const OLLAMA_ENDPOINT: &str = "http://localhost:11434";

pub struct OpenAICompatibleClient {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    http_client: Client,
    timeout: Duration,
    label: String,
}

impl OpenAICompatibleClient {
    /// Creates a client for `endpoint` (without the `/v1/...` suffix).
    pub fn new(
        label: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let http_client =
            Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| BackendError::ConfigurationError {
                    message: format!("Failed to build HTTP client: {}", e),
                })?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            http_client,
            timeout,
            label: label.into(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.endpoint)
    }

    fn to_wire(&self, request: &LLMRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|m| Message {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            seed: request.seed,
            stream: Some(false),
        }
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            error!("{} request timed out after {:?}", self.label, self.timeout);
            BackendError::TimeoutError {
                seconds: self.timeout.as_secs(),
            }
        } else if e.is_connect() {
            error!("Cannot connect to {} at {}", self.label, self.endpoint);
            BackendError::NetworkError {
                message: format!("Connection failed: {}", e),
            }
        } else {
            error!("{} request error: {}", self.label, e);
            BackendError::NetworkError {
                message: format!("Request failed: {}", e),
            }
        }
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
        let body = self.to_wire(&request);
        debug!(
            "Sending request to {}: model={}, prompt_chars={}",
            self.label,
            self.model,
            body.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let start = Instant::now();

        let mut builder = self.http_client.post(self.completions_url()).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            error!("{} returned error status {}: {}", self.label, status, body);

            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    BackendError::AuthenticationError { message: body }
                }
                StatusCode::TOO_MANY_REQUESTS => BackendError::RateLimitError { retry_after },
                _ => BackendError::ApiError {
                    message: format!("HTTP {}: {}", status, body),
                    status_code: Some(status.as_u16()),
                },
            });
        }

        let api_response: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse {
                    message: format!("JSON parse error: {}", e),
                    raw_response: None,
                })?;

        if let Some(usage) = &api_response.usage {
            debug!(
                "{} usage: prompt_tokens={}, completion_tokens={}",
                self.label, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .map(|message| message.content)
            .ok_or_else(|| BackendError::InvalidResponse {
                message: "No content in response".to_string(),
                raw_response: None,
            })?;

        Ok(LLMResponse::text(content.trim(), start.elapsed()))
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn model_info(&self) -> Option<String> {
        Some(format!("{} @ {}", self.model, self.endpoint))
    }
}

impl fmt::Debug for OpenAICompatibleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAICompatibleClient")
            .field("label", &self.label)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::ChatMessage;

    fn client() -> OpenAICompatibleClient {
        OpenAICompatibleClient::new(
            "groq",
            "https://api.groq.com/openai/",
            "llama-3.1-8b-instant",
            Some("test-key".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_completions_url_trims_trailing_slash() {
        assert_eq!(
            client().completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_wire_request_carries_seed_and_temperature() {
        let request = LLMRequest::new(vec![ChatMessage::user("hi")])
            .with_temperature(0.0)
            .with_max_tokens(200)
            .with_seed(42);

        let wire = serde_json::to_value(client().to_wire(&request)).unwrap();

        assert_eq!(wire["model"], "llama-3.1-8b-instant");
        assert_eq!(wire["seed"], 42);
        assert_eq!(wire["max_tokens"], 200);
        assert_eq!(wire["messages"][0]["role"], "user");
    }

    #[test]
    fn test_wire_request_omits_missing_seed() {
        let wire = serde_json::to_value(client().to_wire(&LLMRequest::prompt("hi"))).unwrap();
        assert!(wire.get("seed").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"a\":1}"}}],"usage":{"prompt_tokens":3,"completion_tokens":4,"total_tokens":7}}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.as_ref().unwrap().content,
            r#"{"a":1}"#
        );
        assert_eq!(parsed.usage.unwrap().completion_tokens, 4);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = OpenAICompatibleClient::new(
            "local",
            "http://127.0.0.1:9",
            "m",
            None,
            Duration::from_secs(2),
        )
        .unwrap();

        let err = client.chat(LLMRequest::prompt("hi")).await.unwrap_err();
        assert!(err.is_transport());
    }
}
