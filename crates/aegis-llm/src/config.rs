//! Provider selection from the environment.
//!
//! Precedence for the provider:
//! 1. `AEGIS_LLM_PROVIDER` (`gemini`, `openai`, `anthropic`, `ollama`)
//! 2. the first credential found: `GEMINI_API_KEY`, `OPENAI_API_KEY`,
//!    `ANTHROPIC_API_KEY`, `OLLAMA_HOST`
//!
//! Everything else has a provider default and an env override.

use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub const AEGIS_LLM_PROVIDER_ENV: &str = "AEGIS_LLM_PROVIDER";
pub const AEGIS_LLM_MODEL_ENV: &str = "AEGIS_LLM_MODEL";
pub const AEGIS_LLM_BASE_URL_ENV: &str = "AEGIS_LLM_BASE_URL";
pub const AEGIS_LLM_TIMEOUT_SECS_ENV: &str = "AEGIS_LLM_TIMEOUT_SECS";
pub const AEGIS_LLM_TEMPERATURE_ENV: &str = "AEGIS_LLM_TEMPERATURE";

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";
pub const OLLAMA_HOST_ENV: &str = "OLLAMA_HOST";

pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gemini,
    OpenAi,
    Anthropic,
    Ollama,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(Provider::Gemini),
            "openai" => Some(Provider::OpenAi),
            "anthropic" | "claude" => Some(Provider::Anthropic),
            "ollama" => Some(Provider::Ollama),
            _ => None,
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-2.5-flash",
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Anthropic => "claude-3-5-haiku-latest",
            Provider::Ollama => "llama3.1",
        }
    }

    pub fn default_base_url(self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com/v1beta",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Ollama => "http://127.0.0.1:11434",
        }
    }

    fn key_env(self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some(GEMINI_API_KEY_ENV),
            Provider::OpenAi => Some(OPENAI_API_KEY_ENV),
            Provider::Anthropic => Some(ANTHROPIC_API_KEY_ENV),
            Provider::Ollama => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Provider::Gemini => "gemini",
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Ollama => "ollama",
        })
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// `None` disables the request timeout.
    pub timeout: Option<Duration>,
    pub temperature: f32,
}

// keep keys out of logs
impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

impl LlmConfig {
    /// Defaults for `provider`, no credentials.
    pub fn for_provider(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key: None,
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a config from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let provider = match get(AEGIS_LLM_PROVIDER_ENV) {
            Some(raw) => Provider::parse(&raw).ok_or_else(|| {
                LlmError::Config(format!(
                    "invalid {AEGIS_LLM_PROVIDER_ENV}={raw:?} (expected gemini|openai|anthropic|ollama)"
                ))
            })?,
            None => detect_provider(&get).ok_or_else(|| {
                LlmError::Config(format!(
                    "no model provider configured; set {GEMINI_API_KEY_ENV}, {OPENAI_API_KEY_ENV}, \
                     {ANTHROPIC_API_KEY_ENV} or {OLLAMA_HOST_ENV}"
                ))
            })?,
        };

        let mut config = Self::for_provider(provider);

        if let Some(env) = provider.key_env() {
            config.api_key = Some(get(env).ok_or_else(|| {
                LlmError::Config(format!("{provider} provider requires {env}"))
            })?);
        }

        if let Some(model) = get(AEGIS_LLM_MODEL_ENV) {
            config.model = model;
        }

        if let Some(url) = get(AEGIS_LLM_BASE_URL_ENV) {
            config.base_url = url;
        } else if provider == Provider::Ollama {
            if let Some(host) = get(OLLAMA_HOST_ENV) {
                config.base_url = normalize_ollama_host(&host);
            }
        }
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        if let Some(raw) = get(AEGIS_LLM_TIMEOUT_SECS_ENV) {
            let secs: u64 = raw.parse().map_err(|_| {
                LlmError::Config(format!(
                    "invalid {AEGIS_LLM_TIMEOUT_SECS_ENV}={raw:?} (expected integer)"
                ))
            })?;
            config.timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = get(AEGIS_LLM_TEMPERATURE_ENV) {
            let t: f32 = raw.parse().map_err(|_| {
                LlmError::Config(format!(
                    "invalid {AEGIS_LLM_TEMPERATURE_ENV}={raw:?} (expected number)"
                ))
            })?;
            config.temperature = t.clamp(0.0, 2.0);
        }

        Ok(config)
    }
}

fn detect_provider(get: &impl Fn(&str) -> Option<String>) -> Option<Provider> {
    [
        (GEMINI_API_KEY_ENV, Provider::Gemini),
        (OPENAI_API_KEY_ENV, Provider::OpenAi),
        (ANTHROPIC_API_KEY_ENV, Provider::Anthropic),
        (OLLAMA_HOST_ENV, Provider::Ollama),
    ]
    .into_iter()
    .find(|(env, _)| get(env).is_some())
    .map(|(_, provider)| provider)
}

fn normalize_ollama_host(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{host}")
    }
}
