//! Completion service for Aegis
//!
//! One trait, two generation modes:
//! - **incremental**: `generate_stream` yields text pieces as the model emits
//!   them; concatenated they form the full answer. The stream is consumed once.
//! - **atomic**: `generate_json` returns one structured value after generation
//!   finishes, or [`LlmError::Format`] when the model's text is not JSON.
//!
//! Providers (Gemini, OpenAI-compatible, Anthropic, Ollama) live in
//! [`providers`] and are selected from the environment by [`LlmConfig`].
//! Callers never depend on a concrete provider, so tests substitute scripted
//! implementations of [`CompletionService`].

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod json;
pub mod providers;
mod stream;

pub use config::{LlmConfig, Provider};
pub use json::parse_llm_json;
pub use providers::build_provider;

// ============================================================================
// Conversation types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One prior exchange passed back to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("model output is not valid JSON: {0}")]
    Format(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// The service answered but its text did not parse.
    pub fn is_format(&self) -> bool {
        matches!(self, LlmError::Format(_))
    }
}

// ============================================================================
// Service trait
// ============================================================================

/// Incremental text, exhausted exactly once.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Stream a free-text answer to `prompt`, with `history` as prior turns.
    async fn generate_stream(&self, prompt: &str, history: &[Turn])
        -> Result<TextStream, LlmError>;

    /// Generate a single JSON value for `prompt`.
    async fn generate_json(&self, prompt: &str) -> Result<serde_json::Value, LlmError>;

    /// Drain `generate_stream` into one string.
    async fn complete(&self, prompt: &str, history: &[Turn]) -> Result<String, LlmError> {
        let mut stream = self.generate_stream(prompt, history).await?;
        let mut out = String::new();
        while let Some(piece) = stream.next().await {
            out.push_str(&piece?);
        }
        Ok(out)
    }

    fn model_name(&self) -> &str;
}
