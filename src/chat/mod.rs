//! Chat-completion client abstraction and the Anthropic Messages adapter.
//!
//! Both the upload summary and query answers go through [`ChatClient::complete`]; callers
//! choose the prompt and temperature.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Errors surfaced while requesting a completion.
#[derive(Debug, Error)]
pub enum ChatClientError {
    /// Provider could not be reached.
    #[error("Chat provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate completion: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed or held no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Fully rendered user prompt.
    pub prompt: String,
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f32,
}

/// Interface implemented by chat-completion providers.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Generate a completion for the prompt and return its text.
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError>;
}

/// Anthropic `/v1/messages` client.
pub struct AnthropicChatClient {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicChatClient {
    /// Construct a client from the process configuration.
    pub fn new(config: &Config) -> Result<Self, ChatClientError> {
        let http = Client::builder()
            .user_agent("askpdf/chat")
            .timeout(config.provider_timeout)
            .build()
            .map_err(|error| {
                ChatClientError::ProviderUnavailable(format!(
                    "failed to build HTTP client: {error}"
                ))
            })?;
        tracing::debug!(
            url = %config.anthropic_base_url,
            model = %config.chat_model,
            "Initialized Anthropic chat client"
        );
        Ok(Self {
            http,
            base_url: config.anthropic_base_url.clone(),
            api_key: config.anthropic_api_key.clone(),
            model: config.chat_model.clone(),
            max_tokens: config.chat_max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn collect_text(blocks: Vec<ContentBlock>) -> String {
    blocks
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("")
}

#[async_trait]
impl ChatClient for AnthropicChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<String, ChatClientError> {
        let payload = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: request.temperature,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        tracing::debug!(
            model = %self.model,
            temperature = request.temperature,
            prompt_chars = request.prompt.len(),
            "Requesting completion"
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                ChatClientError::ProviderUnavailable(format!(
                    "failed to reach Anthropic at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ChatClientError::ProviderUnavailable(format!(
                "Anthropic endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatClientError::GenerationFailed(format!(
                "Anthropic returned {status}: {body}"
            )));
        }

        let body: MessagesResponse = response.json().await.map_err(|error| {
            ChatClientError::InvalidResponse(format!(
                "failed to decode Anthropic response: {error}"
            ))
        })?;

        let text = collect_text(body.content);
        if text.trim().is_empty() {
            return Err(ChatClientError::InvalidResponse(
                "Anthropic response contained no text".into(),
            ));
        }

        Ok(text.trim().to_string())
    }
}
