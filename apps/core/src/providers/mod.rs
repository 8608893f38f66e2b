//! Provider Gateway: a uniform `generate` capability over the answer backends.
//!
//! [`ProviderKind`] is the closed set of backends selectable in settings and
//! [`ProviderGateway`] dispatches to the matching client. Every client folds
//! the optional context into its prompt, demands plain-text output, runs the
//! reply through the normalizer and reports failures as [`ProviderError`]
//! values rather than panicking.

pub mod chat_completions;
pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use crate::actors::llm::LocalModelHandle;
use crate::config::ProviderEndpoints;
use crate::settings::ChatSettings;

pub use chat_completions::ChatCompletionsClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;

/// Instruction injected into every provider prompt.
pub const PLAIN_TEXT_INSTRUCTION: &str = "You are a helpful ERP assistant. Always respond in plain text without markdown formatting (no **, ###, ---, or bullet points).";

/// Timeout for hosted chat-style providers.
pub const HOSTED_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for the self-hosted model server on the local network (CPU inference is slow).
pub const SELF_HOSTED_TIMEOUT: Duration = Duration::from_secs(180);

/// Why a provider produced no text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Missing credential or model file.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("timeout")]
    Timeout,

    /// Non-2xx response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection refused, DNS failure and similar.
    #[error("transport error: {0}")]
    Transport(String),

    /// Response body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The backend cannot serve requests (e.g. the local model failed to load).
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Backends selectable in settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProviderKind {
    /// Small GGUF model served by a `llama-server` sidecar this process owns.
    #[default]
    #[serde(rename = "Local")]
    Local,
    #[serde(rename = "OpenRouter")]
    OpenRouter,
    #[serde(rename = "Google Gemini")]
    Gemini,
    #[serde(rename = "DeepSeek")]
    DeepSeek,
    /// Ollama server on the local network.
    #[serde(rename = "Ollama (Local)")]
    Ollama,
}

impl ProviderKind {
    /// Whether answers come from the in-process small model.
    pub fn is_local_model(&self) -> bool {
        matches!(self, ProviderKind::Local)
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderKind::Local => "Local",
            ProviderKind::OpenRouter => "OpenRouter",
            ProviderKind::Gemini => "Google Gemini",
            ProviderKind::DeepSeek => "DeepSeek",
            ProviderKind::Ollama => "Ollama (Local)",
        };
        write!(f, "{}", name)
    }
}

/// Uniform generation capability.
#[async_trait]
pub trait Generator: Send + Sync + 'static {
    /// Backend this generator talks to.
    fn kind(&self) -> ProviderKind;

    /// Produces an answer for `prompt`, folding in `context` when present.
    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError>;
}

/// The configured backend.
pub enum ProviderGateway {
    Local(LocalModelHandle),
    OpenRouter(ChatCompletionsClient),
    Gemini(GeminiClient),
    DeepSeek(ChatCompletionsClient),
    Ollama(OllamaClient),
}

impl ProviderGateway {
    /// Builds the client selected by `settings.provider`.
    pub fn from_settings(
        settings: &ChatSettings,
        endpoints: &ProviderEndpoints,
        local: LocalModelHandle,
    ) -> Self {
        let http = reqwest::Client::new();
        let temperature = settings.temperature;
        match settings.provider {
            ProviderKind::Local => ProviderGateway::Local(local),
            ProviderKind::OpenRouter => ProviderGateway::OpenRouter(ChatCompletionsClient::openrouter(
                http,
                endpoints.openrouter.clone(),
                settings.resolved_key(ProviderKind::OpenRouter),
                temperature,
            )),
            ProviderKind::Gemini => ProviderGateway::Gemini(GeminiClient::new(
                http,
                endpoints.gemini.clone(),
                settings.resolved_key(ProviderKind::Gemini),
                temperature,
            )),
            ProviderKind::DeepSeek => ProviderGateway::DeepSeek(ChatCompletionsClient::deepseek(
                http,
                endpoints.deepseek.clone(),
                settings.resolved_key(ProviderKind::DeepSeek),
                temperature,
            )),
            ProviderKind::Ollama => ProviderGateway::Ollama(OllamaClient::new(
                http,
                endpoints.ollama.clone(),
                settings.ollama_model.clone(),
                temperature,
            )),
        }
    }
}

#[async_trait]
impl Generator for ProviderGateway {
    fn kind(&self) -> ProviderKind {
        match self {
            ProviderGateway::Local(_) => ProviderKind::Local,
            ProviderGateway::OpenRouter(_) => ProviderKind::OpenRouter,
            ProviderGateway::Gemini(_) => ProviderKind::Gemini,
            ProviderGateway::DeepSeek(_) => ProviderKind::DeepSeek,
            ProviderGateway::Ollama(_) => ProviderKind::Ollama,
        }
    }

    async fn generate(
        &self,
        prompt: &str,
        context: Option<&str>,
        max_tokens: u32,
    ) -> Result<String, ProviderError> {
        match self {
            ProviderGateway::Local(handle) => handle.generate(prompt, context, max_tokens).await,
            ProviderGateway::OpenRouter(client) | ProviderGateway::DeepSeek(client) => {
                client.generate(prompt, context, max_tokens).await
            }
            ProviderGateway::Gemini(client) => client.generate(prompt, context, max_tokens).await,
            ProviderGateway::Ollama(client) => client.generate(prompt, context, max_tokens).await,
        }
    }
}

/// Reads a required string at a JSON pointer, or reports the missing field.
pub(crate) fn text_at<'a>(json: &'a serde_json::Value, pointer: &str) -> Result<&'a str, ProviderError> {
    json.pointer(pointer)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Malformed(format!("missing field {}", pointer)))
}

/// Fails on non-2xx responses, keeping the body for the log.
pub(crate) async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::Http {
        status: status.as_u16(),
        body,
    })
}

/// Parses a response body as JSON, mapping parse failures to `Malformed`.
pub(crate) async fn read_json(response: reqwest::Response) -> Result<serde_json::Value, ProviderError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| ProviderError::Malformed(e.to_string()))
}
