use serde::Serialize;
use tokio::sync::oneshot;

use crate::actors::supervisor::{FeedbackRequest, QueryRequest, QueryResponse};
use crate::brain::matcher::SearchFilters;
use crate::models::{Message, ScoredArticle, Suggestion};
use crate::providers::ProviderError;

/// Defines errors that can occur within the actor system.
#[derive(Debug, thiserror::Error, Serialize, Clone)]
pub enum ActorError {
    /// The actor is gone or dropped the request.
    #[error("Internal system error: {0}")]
    Internal(String),
}

// Re-export AppError for convenience
pub use crate::error::AppError;

/// Messages that can be sent to the local model actor.
#[derive(Debug)]
pub enum LlmMessage {
    /// Generate a complete answer, loading the model first if needed.
    Generate {
        prompt: String,
        context: Option<String>,
        max_tokens: u32,
        /// A channel to send the final `String` result back.
        responder: oneshot::Sender<Result<String, ProviderError>>,
    },
}

/// Messages that can be sent to the `SupervisorActor`.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Answer a user's message and record the exchange.
    Query {
        request: QueryRequest,
        responder: oneshot::Sender<QueryResponse>,
    },
    /// Rate a bot message.
    SubmitFeedback {
        request: FeedbackRequest,
        responder: oneshot::Sender<Result<(), AppError>>,
    },
    /// Messages of a session in timestamp order.
    SessionHistory {
        session_id: String,
        limit: i64,
        responder: oneshot::Sender<Result<Vec<Message>, AppError>>,
    },
    /// Fired proactive rules for the current screen.
    ProactiveSuggestions {
        entity_type: Option<String>,
        responder: oneshot::Sender<Result<Vec<Suggestion>, AppError>>,
    },
    /// Plain knowledge-base search.
    SearchKnowledgeBase {
        query: String,
        filters: SearchFilters,
        limit: usize,
        responder: oneshot::Sender<Result<Vec<ScoredArticle>, AppError>>,
    },
    /// A command to shut down the supervisor.
    Shutdown,
}
