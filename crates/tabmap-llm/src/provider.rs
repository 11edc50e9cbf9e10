//! OpenAI-compatible chat-completions provider.
//!
//! One blocking HTTP call per completion; retry and budget policy live in
//! [`crate::TierClient`], not here. Any endpoint speaking the
//! `/chat/completions` shape works (OpenAI, OpenRouter, local gateways).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::capability::{Completion, CompletionRequest, LanguageModel, TokenUsage};
use crate::error::LlmError;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ChatApiConfig {
    /// Endpoint root, e.g. `https://openrouter.ai/api/v1`.
    pub base_url: String,
    pub api_key: String,
    /// Provider model identifier, e.g. `openai/gpt-4o-mini`.
    pub model: String,
    pub timeout: Duration,
}

impl ChatApiConfig {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// A [`LanguageModel`] backed by an OpenAI-compatible HTTP API.
pub struct ChatApiModel {
    client: reqwest::blocking::Client,
    config: ChatApiConfig,
}

impl ChatApiModel {
    pub fn new(config: ChatApiConfig) -> Result<Self, LlmError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Unavailable(format!("could not build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl LanguageModel for ChatApiModel {
    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system_prompt {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.prompt,
        });
        let body = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!(model = %self.config.model, prompt_len = request.prompt.len(), "chat completion request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .map_err(|e| LlmError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().unwrap_or_default();
            return Err(LlmError::Unavailable(format!(
                "API returned {status}: {detail}"
            )));
        }
        let parsed: ChatResponse = response
            .json()
            .map_err(|e| LlmError::Unavailable(format!("malformed API response: {e}")))?;

        let usage = parsed
            .usage
            .map(|u| TokenUsage {
                input_tokens: u.prompt_tokens.unwrap_or(0),
                output_tokens: u.completion_tokens.unwrap_or(0),
            })
            .unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::Unavailable("no choices in API response".to_string()))?;
        Ok(Completion {
            text: choice.message.content,
            usage,
        })
    }
}
