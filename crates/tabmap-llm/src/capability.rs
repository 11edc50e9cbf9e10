//! The language-model capability seam.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::LlmError;

/// A single completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Raw model output plus token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// The sole external intelligence dependency: submit a prompt, receive text,
/// incur a token-based cost. Implementations are provider adapters; the rest
/// of the system only sees this contract.
pub trait LanguageModel: Send + Sync {
    /// Provider model identifier, used for usage accounting.
    fn model_name(&self) -> &str;

    fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError>;
}

/// A model that always fails.
///
/// Used by the CLI's offline mode (and by tests) to exercise the
/// deterministic fallback paths end to end.
pub struct UnavailableModel {
    name: String,
}

impl UnavailableModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for UnavailableModel {
    fn default() -> Self {
        Self::new("offline")
    }
}

impl LanguageModel for UnavailableModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn complete(&self, _request: &CompletionRequest) -> Result<Completion, LlmError> {
        Err(LlmError::Unavailable("model disabled".to_string()))
    }
}

/// A model that replays a queue of scripted responses.
///
/// Each queued entry is either response text or an error message. An
/// exhausted script behaves like an unavailable model.
pub struct ScriptedModel {
    name: String,
    responses: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Mutex::new(VecDeque::new()),
        }
    }

    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.push_response(text);
        self
    }

    #[must_use]
    pub fn with_failure(self, message: impl Into<String>) -> Self {
        self.push_failure(message);
        self
    }

    pub fn push_response(&self, text: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Ok(text.into()));
        }
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.into()));
        }
    }
}

impl LanguageModel for ScriptedModel {
    fn model_name(&self) -> &str {
        &self.name
    }

    fn complete(&self, request: &CompletionRequest) -> Result<Completion, LlmError> {
        let next = self
            .responses
            .lock()
            .map_err(|_| LlmError::Unavailable("script lock poisoned".to_string()))?
            .pop_front();
        match next {
            Some(Ok(text)) => {
                let usage = TokenUsage {
                    input_tokens: (request.prompt.len() / 4) as u64,
                    output_tokens: (text.len() / 4) as u64,
                };
                Ok(Completion { text, usage })
            }
            Some(Err(message)) => Err(LlmError::Unavailable(message)),
            None => Err(LlmError::Unavailable("script exhausted".to_string())),
        }
    }
}
