use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::AppError;
use crate::providers::ProviderKind;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 500;
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u32 = 30;

/// The assistant's configuration store record.
///
/// Stored as a single JSON row. When no row exists the defaults apply, which
/// keep AI disabled so only the knowledge base and templates answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_ai_ranges", skip_on_field_errors = false))]
pub struct ChatSettings {
    pub enable_ai: bool,
    pub provider: ProviderKind,
    pub temperature: f32,
    pub max_tokens: u32,
    #[validate(range(min = 5, max = 240, message = "Session Timeout must be between 5 and 240 minutes"))]
    pub session_timeout_minutes: u32,
    pub openrouter_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    /// Model tag sent to the Ollama server.
    pub ollama_model: Option<String>,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            enable_ai: false,
            provider: ProviderKind::default(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            session_timeout_minutes: DEFAULT_SESSION_TIMEOUT_MINUTES,
            openrouter_api_key: None,
            gemini_api_key: None,
            deepseek_api_key: None,
            ollama_model: None,
        }
    }
}

impl ChatSettings {
    /// Runs write-time validation, turning violations into `ConfigurationInvalid`.
    pub fn validated(self) -> Result<Self, AppError> {
        self.validate()?;
        Ok(self)
    }

    /// Credential for `kind`: the stored key, else the provider's environment variable.
    pub fn resolved_key(&self, kind: ProviderKind) -> Option<String> {
        let (stored, env_var) = match kind {
            ProviderKind::OpenRouter => (&self.openrouter_api_key, "OPENROUTER_API_KEY"),
            ProviderKind::Gemini => (&self.gemini_api_key, "GEMINI_API_KEY"),
            ProviderKind::DeepSeek => (&self.deepseek_api_key, "DEEPSEEK_API_KEY"),
            ProviderKind::Local | ProviderKind::Ollama => return None,
        };

        stored
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(env_var).ok().filter(|k| !k.trim().is_empty()))
    }
}

// Temperature and response length only matter when AI answers are on.
fn validate_ai_ranges(settings: &ChatSettings) -> Result<(), ValidationError> {
    if !settings.enable_ai {
        return Ok(());
    }

    if !(0.1..=1.0).contains(&settings.temperature) {
        return Err(user_error(
            "ai_temperature",
            "AI Temperature must be between 0.1 and 1.0",
        ));
    }

    if !(50..=2000).contains(&settings.max_tokens) {
        return Err(user_error(
            "ai_max_tokens",
            "Max Response Length must be between 50 and 2000",
        ));
    }

    Ok(())
}

fn user_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}
