//! Interaction Recorder: persists a finished exchange.
//!
//! Called after the resolver has produced its answer. Failures here never
//! change the answer the user receives.

use sqlx::sqlite::SqlitePool;
use tracing::{debug, warn};

use crate::actors::traits::KnowledgeStore;
use crate::brain::resolver::Resolution;
use crate::database::{self, NewMessage};
use crate::error::AppError;
use crate::models::{Language, Message, MessageType};

/// Characters of the user text kept as the session's `last_message`.
pub const LAST_MESSAGE_CHARS: usize = 200;

/// Writes the user message, the bot reply and the session counters.
///
/// Returns the stored bot message.
pub async fn record(
    pool: &SqlitePool,
    session_id: &str,
    user_text: &str,
    language: Language,
    resolution: &Resolution,
) -> Result<Message, AppError> {
    database::add_message(
        pool,
        NewMessage {
            session_id,
            message_type: MessageType::User,
            content: user_text,
            language,
            source: None,
            confidence: None,
            query_intent: Some(resolution.intent.label()),
            article_id: None,
        },
    )
    .await?;

    let bot = database::add_message(
        pool,
        NewMessage {
            session_id,
            message_type: MessageType::Bot,
            content: &resolution.answer.answer,
            language,
            source: Some(resolution.answer.source),
            confidence: Some(i64::from(resolution.answer.confidence)),
            query_intent: None,
            article_id: resolution.article_id.as_deref(),
        },
    )
    .await?;

    let last_message: String = user_text.chars().take(LAST_MESSAGE_CHARS).collect();
    database::bump_session(pool, session_id, 2, &last_message).await?;

    debug!(session_id, message_id = bot.id, "exchange recorded");
    Ok(bot)
}

/// Optimistic usage count for the article behind a knowledge-base answer.
///
/// Counted as soon as the answer is chosen, before delivery is confirmed.
/// Best-effort: a failure is logged and otherwise ignored.
pub async fn count_usage(store: &dyn KnowledgeStore, resolution: &Resolution) {
    if let Some(article_id) = &resolution.article_id {
        if let Err(e) = store.increment_usage(article_id).await {
            warn!(article_id = %article_id, error = %e, "failed to increment article usage");
        }
    }
}
