use crate::actors::llm::LocalModelHandle;
use crate::actors::messages::{ActorError, AppError, SupervisorMessage};
use crate::actors::traits::KnowledgeStore;
use crate::brain::language;
use crate::brain::matcher::{self, SearchFilters};
use crate::brain::proactive;
use crate::brain::resolver::Resolver;
use crate::brain::templates::APOLOGY;
use crate::config::ProviderEndpoints;
use crate::database::{self, Database, NewFeedback, NewSession};
use crate::models::{AnswerSource, LanguagePreference, Message, Rating, ScoredArticle, Suggestion};
use crate::providers::{Generator, ProviderGateway};
use crate::recorder;
use crate::settings::ChatSettings;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{timeout, Duration};
use tracing::{error, info, instrument, warn};

/// Messages returned by `session_history` when no limit is given.
pub const DEFAULT_HISTORY_LIMIT: i64 = 50;
/// Results returned by `search_knowledge_base` when no limit is given.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

// A provider call may take up to 180s; leave room for the store round trips.
const QUERY_TIMEOUT: Duration = Duration::from_secs(200);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A user's chat message and where it was typed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    pub message: String,
    /// Continue this session; a new one is opened when absent.
    pub session_id: Option<String>,
    pub context_entity_type: Option<String>,
    pub context_entity_name: Option<String>,
    pub language: LanguagePreference,
}

impl QueryRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

/// The outer handler's reply. `success` is false only when the request itself
/// could not be served, in which case `answer` holds an apology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    pub session_id: Option<String>,
    pub answer: String,
    pub source: Option<AnswerSource>,
    pub confidence: u8,
    pub suggestions: Vec<String>,
    /// Id of the stored bot message; absent when recording failed.
    pub message_id: Option<i64>,
    pub error: Option<String>,
}

impl QueryResponse {
    fn failure(session_id: Option<String>, err: &AppError) -> Self {
        Self {
            success: false,
            session_id,
            answer: APOLOGY.to_string(),
            source: None,
            confidence: 0,
            suggestions: Vec::new(),
            message_id: None,
            error: Some(err.to_string()),
        }
    }
}

/// A rating for one bot message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    pub message_id: i64,
    pub rating: Rating,
    pub feedback_text: Option<String>,
    pub correction: Option<String>,
}

/// Supplies the generator for the current settings, or `None` when AI is off.
pub trait GeneratorSource: Send + Sync + 'static {
    fn generator(&self, settings: &ChatSettings) -> Option<Arc<dyn Generator>>;
}

/// Builds a [`ProviderGateway`] per request so settings changes apply immediately.
pub struct GatewayFactory {
    endpoints: ProviderEndpoints,
    local: LocalModelHandle,
}

impl GatewayFactory {
    pub fn new(endpoints: ProviderEndpoints, local: LocalModelHandle) -> Self {
        Self { endpoints, local }
    }
}

impl GeneratorSource for GatewayFactory {
    fn generator(&self, settings: &ChatSettings) -> Option<Arc<dyn Generator>> {
        if !settings.enable_ai {
            return None;
        }
        let gateway = ProviderGateway::from_settings(settings, &self.endpoints, self.local.clone());
        Some(Arc::new(gateway))
    }
}

/// The outer request handler: resolves, records and serves feedback and history.
pub struct ChatService {
    db: Database,
    knowledge: Arc<dyn KnowledgeStore>,
    generators: Arc<dyn GeneratorSource>,
    user_id: String,
}

impl ChatService {
    pub fn new(db: Database, generators: Arc<dyn GeneratorSource>, user_id: impl Into<String>) -> Self {
        Self {
            knowledge: Arc::new(db.clone()),
            db,
            generators,
            user_id: user_id.into(),
        }
    }

    /// Answers `request`. Never fails: errors become `success: false` with an apology.
    #[instrument(skip(self, request), fields(session_id = ?request.session_id))]
    pub async fn query(&self, request: QueryRequest) -> QueryResponse {
        match self.try_query(&request).await {
            Ok(response) => response,
            Err(e) => {
                error!("Error processing query: {}", e);
                QueryResponse::failure(request.session_id.clone(), &e)
            }
        }
    }

    async fn try_query(&self, request: &QueryRequest) -> Result<QueryResponse, AppError> {
        let pool = self.db.pool();

        let session = match &request.session_id {
            Some(id) => database::get_session(pool, id).await?,
            None => {
                database::create_session(
                    pool,
                    NewSession {
                        user_id: self.user_id.clone(),
                        context_entity_type: request.context_entity_type.clone(),
                        context_entity_name: request.context_entity_name.clone(),
                        language: request.language,
                    },
                )
                .await?
            }
        };

        let language = request
            .language
            .fixed()
            .unwrap_or_else(|| language::detect(&request.message));

        let settings = match database::load_settings(pool).await {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "settings unreadable, answering with AI disabled");
                ChatSettings::default()
            }
        };

        let resolver = Resolver::new(
            self.knowledge.clone(),
            self.generators.generator(&settings),
            settings.max_tokens,
        );
        let context_entity_type = session
            .context_entity_type
            .as_deref()
            .or(request.context_entity_type.as_deref());
        let resolution = resolver
            .resolve(&request.message, context_entity_type, language)
            .await;

        recorder::count_usage(self.knowledge.as_ref(), &resolution).await;

        let message_id = match recorder::record(pool, &session.id, &request.message, language, &resolution).await {
            Ok(bot) => Some(bot.id),
            Err(e) => {
                error!(session_id = %session.id, error = %e, "failed to record exchange");
                None
            }
        };

        let answer = resolution.answer;
        Ok(QueryResponse {
            success: true,
            session_id: Some(session.id),
            answer: answer.answer,
            source: Some(answer.source),
            confidence: answer.confidence,
            suggestions: answer.suggestions,
            message_id,
            error: None,
        })
    }

    /// Stores a rating and, for knowledge-base answers, updates the article's counters.
    #[instrument(skip(self, request), fields(message_id = request.message_id))]
    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), AppError> {
        let pool = self.db.pool();
        let message = database::get_message(pool, request.message_id).await?;
        let helpful = request.rating == Rating::Helpful;

        database::add_feedback(
            pool,
            NewFeedback {
                message_id: message.id,
                session_id: message.session_id.clone(),
                user_id: self.user_id.clone(),
                rating: request.rating,
                feedback_text: request.feedback_text,
                correction: request.correction,
            },
        )
        .await?;
        database::set_message_helpful(pool, message.id, helpful).await?;

        if message.source == Some(AnswerSource::KnowledgeBase) {
            if let Some(article_id) = &message.article_id {
                if let Err(e) = database::record_article_rating(pool, article_id, helpful).await {
                    warn!(article_id = %article_id, error = %e, "failed to update article rating");
                }
            }
        }

        info!(rating = ?request.rating, "Feedback recorded");
        Ok(())
    }

    pub async fn session_history(&self, session_id: &str, limit: i64) -> Result<Vec<Message>, AppError> {
        let pool = self.db.pool();
        database::get_session(pool, session_id).await?;
        database::get_session_messages(pool, session_id, limit).await
    }

    pub async fn proactive_suggestions(&self, entity_type: Option<&str>) -> Result<Vec<Suggestion>, AppError> {
        let rules = database::active_rules(self.db.pool()).await?;
        Ok(proactive::evaluate(&rules, entity_type, &self.db).await)
    }

    pub async fn search_knowledge_base(
        &self,
        query: &str,
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<ScoredArticle>, AppError> {
        let articles = self.knowledge.candidate_articles(filters).await?;
        Ok(matcher::search(query, &articles, filters, limit))
    }

    pub async fn settings(&self) -> Result<ChatSettings, AppError> {
        database::load_settings(self.db.pool()).await
    }

    pub async fn update_settings(&self, settings: ChatSettings) -> Result<ChatSettings, AppError> {
        database::save_settings(self.db.pool(), settings).await
    }
}

/// A handle to the `SupervisorActor`.
///
/// This is the primary entry point for the binary. Every request is served on
/// its own task, so a slow provider call never blocks other requests.
#[derive(Clone)]
pub struct SupervisorHandle {
    sender: mpsc::Sender<SupervisorMessage>,
}

impl SupervisorHandle {
    pub fn new(service: ChatService) -> Self {
        let (sender, receiver) = mpsc::channel(32);
        let actor = SupervisorRunner {
            receiver,
            service: Arc::new(service),
        };
        tokio::spawn(async move { actor.run().await });
        Self { sender }
    }

    async fn request<T>(
        &self,
        msg: SupervisorMessage,
        recv: oneshot::Receiver<T>,
        limit: Duration,
    ) -> Result<T, AppError> {
        self.sender
            .send(msg)
            .await
            .map_err(|e| AppError::Actor(ActorError::Internal(e.to_string())))?;
        timeout(limit, recv)
            .await?
            .map_err(|e| AppError::Actor(ActorError::Internal(e.to_string())))
    }

    #[instrument(skip(self, request))]
    pub async fn query(&self, request: QueryRequest) -> Result<QueryResponse, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::Query {
            request,
            responder: send,
        };
        self.request(msg, recv, QUERY_TIMEOUT).await
    }

    pub async fn submit_feedback(&self, request: FeedbackRequest) -> Result<(), AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::SubmitFeedback {
            request,
            responder: send,
        };
        self.request(msg, recv, REQUEST_TIMEOUT).await?
    }

    pub async fn session_history(&self, session_id: String, limit: i64) -> Result<Vec<Message>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::SessionHistory {
            session_id,
            limit,
            responder: send,
        };
        self.request(msg, recv, REQUEST_TIMEOUT).await?
    }

    pub async fn proactive_suggestions(&self, entity_type: Option<String>) -> Result<Vec<Suggestion>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::ProactiveSuggestions {
            entity_type,
            responder: send,
        };
        self.request(msg, recv, REQUEST_TIMEOUT).await?
    }

    pub async fn search_knowledge_base(
        &self,
        query: String,
        filters: SearchFilters,
        limit: usize,
    ) -> Result<Vec<ScoredArticle>, AppError> {
        let (send, recv) = oneshot::channel();
        let msg = SupervisorMessage::SearchKnowledgeBase {
            query,
            filters,
            limit,
            responder: send,
        };
        self.request(msg, recv, REQUEST_TIMEOUT).await?
    }

    pub async fn shutdown(&self) {
        let _ = self.sender.send(SupervisorMessage::Shutdown).await;
    }
}

// --- Actor Runner ---
struct SupervisorRunner {
    receiver: mpsc::Receiver<SupervisorMessage>,
    service: Arc<ChatService>,
}

impl SupervisorRunner {
    async fn run(mut self) {
        info!("Supervisor started");
        while let Some(msg) = self.receiver.recv().await {
            if matches!(msg, SupervisorMessage::Shutdown) {
                info!("Supervisor shutting down...");
                break;
            }
            let service = self.service.clone();
            tokio::spawn(async move { Self::handle_message(service, msg).await });
        }
        info!("Supervisor stopped");
    }

    async fn handle_message(service: Arc<ChatService>, msg: SupervisorMessage) {
        match msg {
            SupervisorMessage::Query { request, responder } => {
                let _ = responder.send(service.query(request).await);
            }
            SupervisorMessage::SubmitFeedback { request, responder } => {
                let result = service.submit_feedback(request).await;
                if let Err(e) = &result {
                    error!("Error submitting feedback: {}", e);
                }
                let _ = responder.send(result);
            }
            SupervisorMessage::SessionHistory {
                session_id,
                limit,
                responder,
            } => {
                let _ = responder.send(service.session_history(&session_id, limit).await);
            }
            SupervisorMessage::ProactiveSuggestions { entity_type, responder } => {
                let _ = responder.send(service.proactive_suggestions(entity_type.as_deref()).await);
            }
            SupervisorMessage::SearchKnowledgeBase {
                query,
                filters,
                limit,
                responder,
            } => {
                let _ = responder.send(service.search_knowledge_base(&query, &filters, limit).await);
            }
            SupervisorMessage::Shutdown => {}
        }
    }
}
