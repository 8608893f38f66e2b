use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::actors::llm::LocalModelConfig;
use crate::error::AppError;

pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro-latest:generateContent";
pub const DEFAULT_DEEPSEEK_URL: &str = "https://api.deepseek.com/v1/chat/completions";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";

/// Small instruct model served by the local `llama-server`.
pub const DEFAULT_MODEL_FILENAME: &str = "qwen2.5-0.5b-instruct-q4_k_m.gguf";
pub const DEFAULT_LLAMA_PORT: u16 = 8080;

/// Where each hosted backend lives. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    pub openrouter: String,
    pub gemini: String,
    pub deepseek: String,
    pub ollama: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openrouter: DEFAULT_OPENROUTER_URL.to_string(),
            gemini: DEFAULT_GEMINI_URL.to_string(),
            deepseek: DEFAULT_DEEPSEEK_URL.to_string(),
            ollama: DEFAULT_OLLAMA_URL.to_string(),
        }
    }
}

impl ProviderEndpoints {
    fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            openrouter: env::var("ERPCHAT_OPENROUTER_URL").unwrap_or(defaults.openrouter),
            gemini: env::var("ERPCHAT_GEMINI_URL").unwrap_or(defaults.gemini),
            deepseek: env::var("ERPCHAT_DEEPSEEK_URL").unwrap_or(defaults.deepseek),
            ollama: env::var("ERPCHAT_OLLAMA_URL").unwrap_or(defaults.ollama),
        }
    }
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_url: String,
    pub local_model: LocalModelConfig,
    pub endpoints: ProviderEndpoints,
    /// The `.env` file the environment was loaded from, if any.
    pub env_file: Option<PathBuf>,
}

impl AppConfig {
    /// Loads `.env` if present, then reads the environment.
    ///
    /// Nothing is logged here since telemetry is not up yet; the caller
    /// reports `env_file` once it is.
    pub fn load() -> Result<Self, AppError> {
        let env_file = dotenv::dotenv().ok();
        Ok(Self {
            env_file,
            ..Self::from_env()?
        })
    }

    /// Like [`AppConfig::load`] but with an explicit `.env` file, which must exist.
    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        dotenv::from_path(path)
            .map_err(|e| AppError::Config(format!("cannot load {}: {}", path.display(), e)))?;
        Ok(Self {
            env_file: Some(path.to_path_buf()),
            ..Self::from_env()?
        })
    }

    pub fn from_env() -> Result<Self, AppError> {
        let data_dir = env::var("ERPCHAT_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));

        let database_url = env::var("ERPCHAT_DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "sqlite://{}",
                Self::db_dir(&data_dir).join("erpchat.sqlite").to_string_lossy()
            )
        });

        let model_path = env::var("ERPCHAT_LOCAL_MODEL")
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::models_dir(&data_dir).join(DEFAULT_MODEL_FILENAME));

        let port = match env::var("ERPCHAT_LLAMA_PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| AppError::Config(format!("ERPCHAT_LLAMA_PORT is not a port: {}", raw)))?,
            Err(_) => DEFAULT_LLAMA_PORT,
        };

        let server_binary = env::var("ERPCHAT_LLAMA_SERVER")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("llama-server"));

        let auth_token = env::var("LLAMA_AUTH_TOKEN").ok().filter(|t| !t.is_empty());

        Ok(Self {
            data_dir,
            database_url,
            local_model: LocalModelConfig {
                model_path,
                server_binary,
                port,
                auth_token,
            },
            endpoints: ProviderEndpoints::from_env(),
            env_file: None,
        })
    }

    /// `<data>/db`
    pub fn db_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("db")
    }

    /// `<data>/models`
    pub fn models_dir(data_dir: &Path) -> PathBuf {
        data_dir.join("models")
    }

    /// Creates the data, db and models directories if missing.
    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        for dir in [
            self.data_dir.clone(),
            Self::db_dir(&self.data_dir),
            Self::models_dir(&self.data_dir),
        ] {
            if !dir.exists() {
                info!("Creating directory: {:?}", dir);
                fs::create_dir_all(&dir)?;
            }
        }
        Ok(())
    }
}
