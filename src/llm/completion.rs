//! Blocking client for `OpenAI`-compatible chat-completion endpoints.
//!
//! Behaviour:
//! - `POST {base_url}/chat/completions` with a bearer credential.
//! - Sends the full history plus `model`, `temperature` and `max_tokens`.
//! - Returns the first choice's message content.
//!
//! The client never touches conversation state; appending the reply is the
//! caller's job.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::chat::core::config::{GenerationConfig, LlmConfig};
use crate::chat::core::message::Message;
use crate::llm::error::CompletionError;

/// Longest error body kept in [`CompletionError::Status`].
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Anything able to turn a history into an assistant reply.
pub trait CompletionClient: Send + Sync {
    /// Request a completion for `history`.
    ///
    /// # Errors
    /// Returns an error on transport failure, timeout, non-success status or a
    /// response without content.
    fn complete(
        &self,
        history: &[Message],
        config: &GenerationConfig,
    ) -> Result<String, CompletionError>;
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
    max_tokens: u32,
    stream: bool,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Blocking `OpenAI`-compatible client (Together, `OpenAI`, `vLLM`, Ollama's `/v1`).
pub struct OpenAiCompatClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl OpenAiCompatClient {
    /// Build a client from endpoint settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LlmConfig) -> Result<Self, CompletionError> {
        let client = build_client(config.connect_timeout, config.request_timeout)?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key.clone(),
        })
    }

    /// Full URL requests are sent to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CompletionClient for OpenAiCompatClient {
    fn complete(
        &self,
        history: &[Message],
        config: &GenerationConfig,
    ) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            model: &config.model,
            messages: history,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: false,
        };

        tracing::debug!(
            model = %config.model,
            messages = history.len(),
            "sending chat completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .map_err(CompletionError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: error_body(status, response.text()),
            });
        }

        let parsed = response
            .json::<ChatCompletionResponse>()
            .map_err(CompletionError::from_transport)?;

        parsed
            .choices
            .into_iter()
            .next()
            .ok_or(CompletionError::NoChoices)?
            .message
            .and_then(|message| message.content)
            .ok_or(CompletionError::MissingContent)
    }
}

/// Truncated body of a failed response. Falls back to the status reason
/// when the body is empty or unreadable.
fn error_body(status: StatusCode, body: reqwest::Result<String>) -> String {
    let reason = || status.canonical_reason().unwrap_or("unknown status").to_string();
    match body {
        Ok(body) if body.trim().is_empty() => reason(),
        Ok(body) => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        Err(err) => {
            tracing::warn!(status = status.as_u16(), "failed to read error body: {err}");
            reason()
        }
    }
}

fn build_client(connect_timeout: Duration, timeout: Duration) -> Result<Client, CompletionError> {
    Client::builder()
        .connect_timeout(connect_timeout)
        .timeout(timeout)
        .build()
        .map_err(CompletionError::from)
}
