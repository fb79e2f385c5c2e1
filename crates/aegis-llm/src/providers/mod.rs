//! HTTP model providers.
//!
//! All four speak the same [`CompletionService`] contract:
//! - streaming answers are read line by line from SSE (Gemini, OpenAI,
//!   Anthropic) or NDJSON (Ollama) bodies
//! - JSON mode asks the provider for JSON output where it supports it, then
//!   runs the text through [`parse_llm_json`] regardless

use crate::{parse_llm_json, CompletionService, LlmConfig, LlmError, Provider, Role, Turn};
use std::sync::Arc;

mod anthropic;
mod gemini;
mod ollama;
mod openai;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;

/// Construct the provider `config` names.
pub fn build_provider(config: LlmConfig) -> Result<Arc<dyn CompletionService>, LlmError> {
    tracing::debug!(provider = %config.provider, model = %config.model, "building completion service");
    Ok(match config.provider {
        Provider::Gemini => Arc::new(GeminiProvider::new(config)?),
        Provider::OpenAi => Arc::new(OpenAiProvider::new(config)?),
        Provider::Anthropic => Arc::new(AnthropicProvider::new(config)?),
        Provider::Ollama => Arc::new(OllamaProvider::new(config)?),
    })
}

pub(crate) fn http_client(config: &LlmConfig) -> Result<reqwest::Client, LlmError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LlmError::Config(format!("failed to build http client: {e}")))
}

pub(crate) fn require_key(config: &LlmConfig) -> Result<String, LlmError> {
    config
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| LlmError::Config(format!("{} provider requires an API key", config.provider)))
}

/// `(role, content)` pairs in chat order: history, then the prompt.
pub(crate) fn chat_messages<'a>(
    prompt: &'a str,
    history: &'a [Turn],
) -> impl Iterator<Item = (Role, &'a str)> + 'a {
    history
        .iter()
        .map(|t| (t.role, t.content.as_str()))
        .chain(std::iter::once((Role::User, prompt)))
}

pub(crate) fn json_from_text(text: &str) -> Result<serde_json::Value, LlmError> {
    let value = parse_llm_json(text);
    if let Err(err) = &value {
        tracing::warn!(error = %err, "model returned non-JSON output");
    }
    value
}
