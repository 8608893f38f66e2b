use std::io;
use thiserror::Error;

/// Application-wide error type, consolidating all possible errors into a single enum.
#[derive(Debug, Error)]
pub enum AppError {
    /// Represents errors originating from the record store, typically from `sqlx`.
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Represents standard input/output errors.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Represents errors specific to the actor system, such as communication failures.
    #[error("Actor error: {0}")]
    Actor(#[from] crate::actors::messages::ActorError),

    /// A session, message, article or rule that the caller referenced does not exist.
    #[error("{kind} not found: {key}")]
    RecordNotFound { kind: &'static str, key: String },

    /// Settings rejected at write time. The message is meant for the end user.
    #[error("{0}")]
    ConfigurationInvalid(String),

    /// A single proactive rule could not be evaluated.
    #[error("Rule '{rule}' could not be evaluated: {reason}")]
    RuleEvaluation { rule: String, reason: String },

    /// Represents data validation errors (e.g., invalid input format).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Represents configuration-related errors (e.g., missing environment variables).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Represents unexpected internal errors that indicate a bug.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Represents errors from operations that did not complete in time.
    #[error("Operation timed out: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        AppError::RecordNotFound {
            kind,
            key: key.into(),
        }
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        match self {
            AppError::Database(e) => AppError::Database(sqlx::Error::Protocol(e.to_string())),
            AppError::Io(e) => AppError::Io(io::Error::new(e.kind(), e.to_string())),
            AppError::Actor(e) => AppError::Actor(e.clone()),
            AppError::RecordNotFound { kind, key } => AppError::RecordNotFound {
                kind,
                key: key.clone(),
            },
            AppError::ConfigurationInvalid(s) => AppError::ConfigurationInvalid(s.clone()),
            AppError::RuleEvaluation { rule, reason } => AppError::RuleEvaluation {
                rule: rule.clone(),
                reason: reason.clone(),
            },
            AppError::Validation(s) => AppError::Validation(s.clone()),
            AppError::Config(s) => AppError::Config(s.clone()),
            AppError::Internal(s) => AppError::Internal(s.clone()),
            AppError::Timeout(s) => AppError::Timeout(s.clone()),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::not_found("Record", "<query>"),
            other => AppError::Database(other),
        }
    }
}

impl From<tokio::time::error::Elapsed> for AppError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        AppError::Timeout(format!("Operation timed out: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = err
            .errors()
            .values()
            .filter_map(|kind| match kind {
                validator::ValidationErrorsKind::Field(errors) => Some(errors),
                _ => None,
            })
            .flatten()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        messages.sort();
        AppError::ConfigurationInvalid(messages.join("; "))
    }
}
