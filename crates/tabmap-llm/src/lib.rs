//! Tiered language-model client.
//!
//! The external LLM API is a black box behind the [`LanguageModel`] trait:
//! submit a prompt, receive text, incur a token-based cost. This crate wraps
//! that capability per tier with retry, daily budget enforcement, durable
//! usage accounting, and robust response-to-JSON extraction, and owns the
//! prompt templates whose output contracts the extractor depends on.

pub mod capability;
pub mod client;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod prompt;
pub mod provider;

pub use capability::{
    Completion, CompletionRequest, LanguageModel, ScriptedModel, TokenUsage, UnavailableModel,
};
pub use client::{CallMetadata, CallOptions, CallOutcome, ConfidenceScale, TierClient, TierConfig};
pub use error::LlmError;
pub use extract::{Extracted, extract_json, extract_json_lenient};
pub use ledger::UsageLedger;
pub use provider::{ChatApiConfig, ChatApiModel};
