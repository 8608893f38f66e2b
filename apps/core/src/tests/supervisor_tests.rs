//! The outer request handler and the supervisor actor.

use crate::actors::supervisor::{ChatService, FeedbackRequest, QueryRequest, SupervisorHandle};
use crate::brain::matcher::SearchFilters;
use crate::brain::templates::APOLOGY;
use crate::database::{self, Database};
use crate::error::AppError;
use crate::models::{AnswerSource, Language, LanguagePreference, MessageType, Rating};
use crate::providers::ProviderKind;
use crate::settings::ChatSettings;
use crate::tests::fixtures::{article, create_test_db, FixedGenerators, ScriptedGenerator};
use std::sync::Arc;
use tempfile::TempDir;

const REPLY: &str = "Open Stock Entry and choose Material Transfer between warehouses.";

struct Harness {
    service: ChatService,
    db: Database,
    generator: Arc<ScriptedGenerator>,
    _dir: TempDir,
}

async fn harness() -> Harness {
    let (db, dir) = create_test_db().await;
    for a in [
        article("si", "Sales Invoice", &["invoice", "billing"]),
        article("stock", "Stock Entry", &["warehouse"]),
    ] {
        database::insert_article(db.pool(), &a).await.unwrap();
    }
    let generator = Arc::new(ScriptedGenerator::replying(ProviderKind::OpenRouter, REPLY));
    let service = ChatService::new(db.clone(), Arc::new(FixedGenerators(generator.clone())), "tester");
    Harness {
        service,
        db,
        generator,
        _dir: dir,
    }
}

async fn enable_ai(db: &Database) {
    let settings = ChatSettings {
        enable_ai: true,
        provider: ProviderKind::OpenRouter,
        ..Default::default()
    };
    database::save_settings(db.pool(), settings).await.unwrap();
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_query_opens_session_and_records_exchange() {
    let h = harness().await;

    let response = h.service.query(QueryRequest::new("sales invoice billing")).await;

    assert!(response.success);
    assert_eq!(response.source, Some(AnswerSource::KnowledgeBase));
    assert_eq!(response.confidence, 90);
    let session_id = response.session_id.clone().unwrap();

    let session = database::get_session(h.db.pool(), &session_id).await.unwrap();
    assert_eq!(session.message_count, 2);
    assert_eq!(session.last_message.as_deref(), Some("sales invoice billing"));
    assert_eq!(session.user_id, "tester");

    let messages = database::get_session_messages(h.db.pool(), &session_id, 10).await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].message_type, MessageType::User);
    assert_eq!(messages[0].query_intent.as_deref(), Some("general"));
    assert_eq!(messages[1].message_type, MessageType::Bot);
    assert_eq!(messages[1].source, Some(AnswerSource::KnowledgeBase));
    assert_eq!(messages[1].confidence, Some(90));
    assert_eq!(messages[1].article_id.as_deref(), Some("si"));
    assert_eq!(response.message_id, Some(messages[1].id));
}

#[tokio::test]
async fn test_knowledge_base_answer_counts_usage() {
    let h = harness().await;

    h.service.query(QueryRequest::new("sales invoice")).await;
    h.service.query(QueryRequest::new("good morning")).await;

    let si = database::get_article(h.db.pool(), "si").await.unwrap();
    assert_eq!(si.usage_count, 1);
    let stock = database::get_article(h.db.pool(), "stock").await.unwrap();
    assert_eq!(stock.usage_count, 0);
}

#[tokio::test]
async fn test_follow_up_reuses_session() {
    let h = harness().await;

    let first = h.service.query(QueryRequest::new("sales invoice")).await;
    let second = h
        .service
        .query(QueryRequest {
            session_id: first.session_id.clone(),
            ..QueryRequest::new("stock warehouse")
        })
        .await;

    assert_eq!(first.session_id, second.session_id);
    let session = database::get_session(h.db.pool(), first.session_id.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(session.message_count, 4);
    assert_eq!(session.last_message.as_deref(), Some("stock warehouse"));
}

#[tokio::test]
async fn test_unknown_session_returns_apology() {
    let h = harness().await;

    let response = h
        .service
        .query(QueryRequest {
            session_id: Some("no-such-session".into()),
            ..QueryRequest::new("sales invoice")
        })
        .await;

    assert!(!response.success);
    assert_eq!(response.answer, APOLOGY);
    assert_eq!(response.confidence, 0);
    assert_eq!(response.session_id.as_deref(), Some("no-such-session"));
    assert!(response.error.unwrap().contains("Chat Session"));
}

#[tokio::test]
async fn test_auto_detect_answers_in_urdu() {
    let h = harness().await;

    let response = h.service.query(QueryRequest::new("السلام علیکم")).await;

    assert!(response.success);
    assert_eq!(response.source, Some(AnswerSource::RuleBased));
    assert!(response.answer.starts_with("میں آپ کی مدد"));
    let messages = database::get_session_messages(h.db.pool(), response.session_id.as_deref().unwrap(), 10)
        .await
        .unwrap();
    assert!(messages.iter().all(|m| m.language == Language::Urdu));
}

#[tokio::test]
async fn test_explicit_language_overrides_detection() {
    let h = harness().await;

    let response = h
        .service
        .query(QueryRequest {
            language: LanguagePreference::Urdu,
            ..QueryRequest::new("sales invoice")
        })
        .await;

    assert_eq!(response.answer, "Sales Invoice کا جواب");
}

#[tokio::test]
async fn test_session_context_wins_over_request_context() {
    let h = harness().await;

    let first = h
        .service
        .query(QueryRequest {
            context_entity_type: Some("Sales Invoice".into()),
            ..QueryRequest::new("hello")
        })
        .await;
    assert_eq!(first.source, Some(AnswerSource::ContextAware));

    let second = h
        .service
        .query(QueryRequest {
            session_id: first.session_id.clone(),
            context_entity_type: Some("Employee".into()),
            ..QueryRequest::new("hello again")
        })
        .await;
    assert_eq!(second.answer, first.answer);
}

#[tokio::test]
async fn test_ai_follows_stored_settings() {
    let h = harness().await;

    let off = h.service.query(QueryRequest::new("transfer stock")).await;
    assert_eq!(off.source, Some(AnswerSource::RuleBased));
    assert_eq!(h.generator.calls(), 0);

    enable_ai(&h.db).await;
    let on = h.service.query(QueryRequest::new("transfer stock")).await;
    assert_eq!(on.source, Some(AnswerSource::Llm));
    assert_eq!(on.answer, REPLY);
    assert_eq!(on.confidence, 85);
    assert_eq!(on.suggestions, vec!["Stock Entry".to_string()]);
    assert_eq!(h.generator.calls(), 1);
}

// ============================================================================
// Feedback, history, search, settings
// ============================================================================

#[tokio::test]
async fn test_helpful_feedback_credits_the_answering_article() {
    let h = harness().await;
    let response = h.service.query(QueryRequest::new("sales invoice")).await;
    let message_id = response.message_id.unwrap();

    h.service
        .submit_feedback(FeedbackRequest {
            message_id,
            rating: Rating::Helpful,
            feedback_text: None,
            correction: None,
        })
        .await
        .unwrap();

    let message = database::get_message(h.db.pool(), message_id).await.unwrap();
    assert_eq!(message.helpful.as_deref(), Some("Yes"));
    let si = database::get_article(h.db.pool(), "si").await.unwrap();
    assert_eq!(si.helpful_count, 1);
    assert_eq!(si.unhelpful_count, 0);
}

#[tokio::test]
async fn test_partial_feedback_counts_as_unhelpful() {
    let h = harness().await;
    let response = h.service.query(QueryRequest::new("sales invoice")).await;

    h.service
        .submit_feedback(FeedbackRequest {
            message_id: response.message_id.unwrap(),
            rating: Rating::PartiallyHelpful,
            feedback_text: Some("missing the print step".into()),
            correction: None,
        })
        .await
        .unwrap();

    let si = database::get_article(h.db.pool(), "si").await.unwrap();
    assert_eq!(si.unhelpful_count, 1);
}

#[tokio::test]
async fn test_feedback_on_template_answer_touches_no_article() {
    let h = harness().await;
    let response = h.service.query(QueryRequest::new("good morning")).await;

    h.service
        .submit_feedback(FeedbackRequest {
            message_id: response.message_id.unwrap(),
            rating: Rating::NotHelpful,
            feedback_text: None,
            correction: Some("Say good morning back".into()),
        })
        .await
        .unwrap();

    for id in ["si", "stock"] {
        let a = database::get_article(h.db.pool(), id).await.unwrap();
        assert_eq!(a.helpful_count + a.unhelpful_count, 0);
    }
}

#[tokio::test]
async fn test_feedback_for_unknown_message_fails() {
    let h = harness().await;

    let err = h
        .service
        .submit_feedback(FeedbackRequest {
            message_id: 4242,
            rating: Rating::Helpful,
            feedback_text: None,
            correction: None,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::RecordNotFound { kind: "Chat Message", .. }));
}

#[tokio::test]
async fn test_session_history() {
    let h = harness().await;
    let response = h.service.query(QueryRequest::new("sales invoice")).await;
    let session_id = response.session_id.unwrap();

    let history = h.service.session_history(&session_id, 50).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "sales invoice");

    let err = h.service.session_history("missing", 50).await.unwrap_err();
    assert!(matches!(err, AppError::RecordNotFound { .. }));
}

#[tokio::test]
async fn test_search_ranks_and_limits() {
    let h = harness().await;

    let results = h
        .service
        .search_knowledge_base("invoice billing warehouse", &SearchFilters::default(), 1)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].article.id, "si");
    assert_eq!(results[0].relevance_score, 2);
}

#[tokio::test]
async fn test_update_settings_validates() {
    let h = harness().await;

    let bad = ChatSettings {
        session_timeout_minutes: 1,
        ..Default::default()
    };
    assert!(matches!(
        h.service.update_settings(bad).await,
        Err(AppError::ConfigurationInvalid(_))
    ));

    let good = ChatSettings {
        session_timeout_minutes: 60,
        ..Default::default()
    };
    h.service.update_settings(good.clone()).await.unwrap();
    assert_eq!(h.service.settings().await.unwrap(), good);
}

// ============================================================================
// Supervisor actor
// ============================================================================

#[tokio::test]
async fn test_supervisor_serves_requests() {
    let h = harness().await;
    database::add_document(h.db.pool(), "HR-LAP-1", "Leave Application", 0)
        .await
        .unwrap();
    crate::seed::load_proactive_rules(h.db.pool()).await.unwrap();
    let supervisor = SupervisorHandle::new(h.service);

    let response = supervisor.query(QueryRequest::new("sales invoice")).await.unwrap();
    assert!(response.success);

    let history = supervisor
        .session_history(response.session_id.unwrap(), 10)
        .await
        .unwrap();
    assert_eq!(history.len(), 2);

    let suggestions = supervisor.proactive_suggestions(None).await.unwrap();
    let rules: Vec<&str> = suggestions.iter().map(|s| s.rule.as_str()).collect();
    assert_eq!(rules, vec!["Pending Leave Approvals"]);

    let results = supervisor
        .search_knowledge_base("warehouse".into(), SearchFilters::default(), 10)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn test_supervisor_handles_concurrent_queries() {
    let h = harness().await;
    let supervisor = SupervisorHandle::new(h.service);

    let (a, b) = tokio::join!(
        supervisor.query(QueryRequest::new("sales invoice")),
        supervisor.query(QueryRequest::new("stock warehouse"))
    );

    let (a, b) = (a.unwrap(), b.unwrap());
    assert!(a.success && b.success);
    assert_ne!(a.session_id, b.session_id);
}

#[tokio::test]
async fn test_supervisor_rejects_requests_after_shutdown() {
    let h = harness().await;
    let supervisor = SupervisorHandle::new(h.service);

    supervisor.shutdown().await;
    let result = supervisor.query(QueryRequest::new("sales invoice")).await;

    assert!(matches!(result, Err(AppError::Actor(_))));
}
