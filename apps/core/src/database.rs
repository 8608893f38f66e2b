use crate::actors::traits::{KnowledgeStore, OperationalMetrics};
use crate::brain::matcher::SearchFilters;
use crate::error::AppError;
use crate::models::{
    AnswerSource, Feedback, KnowledgeArticle, Language, LanguagePreference, Message, MessageType,
    ProactiveRule, Rating, Session,
};
use crate::settings::ChatSettings;
use async_trait::async_trait;
use chrono::{Duration, Local, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{QueryBuilder, Sqlite};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        user_id TEXT NOT NULL,
        started_at INTEGER NOT NULL,
        status TEXT NOT NULL,
        context_entity_type TEXT,
        context_entity_name TEXT,
        language TEXT NOT NULL,
        message_count INTEGER NOT NULL DEFAULT 0,
        last_message TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        session_id TEXT NOT NULL,
        message_type TEXT NOT NULL,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        language TEXT NOT NULL,
        source TEXT,
        confidence INTEGER,
        query_intent TEXT,
        article_id TEXT,
        helpful TEXT,
        FOREIGN KEY(session_id) REFERENCES sessions(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS feedback (
        id TEXT PRIMARY KEY,
        message_id INTEGER NOT NULL,
        session_id TEXT NOT NULL,
        user_id TEXT NOT NULL,
        rating TEXT NOT NULL,
        feedback_text TEXT,
        correction TEXT,
        created_at INTEGER NOT NULL,
        FOREIGN KEY(message_id) REFERENCES messages(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS knowledge_articles (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL UNIQUE,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        answer_urdu TEXT,
        category TEXT NOT NULL,
        language TEXT NOT NULL,
        keywords TEXT NOT NULL,
        usage_count INTEGER NOT NULL DEFAULT 0,
        helpful_count INTEGER NOT NULL DEFAULT 0,
        unhelpful_count INTEGER NOT NULL DEFAULT 0,
        related_entity_type TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS proactive_rules (
        name TEXT PRIMARY KEY,
        description TEXT,
        rule_type TEXT NOT NULL,
        target_entity_type TEXT,
        condition_expr TEXT NOT NULL,
        message TEXT NOT NULL,
        message_urdu TEXT,
        priority TEXT NOT NULL,
        frequency TEXT,
        is_active BOOLEAN NOT NULL DEFAULT 1
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS settings (
        id INTEGER PRIMARY KEY CHECK (id = 1),
        data TEXT NOT NULL
    )
    "#,
    // Operational data the proactive rules look at.
    r#"
    CREATE TABLE IF NOT EXISTS bins (
        item_code TEXT NOT NULL,
        warehouse TEXT NOT NULL,
        actual_qty REAL NOT NULL,
        reorder_level REAL NOT NULL DEFAULT 0,
        PRIMARY KEY (item_code, warehouse)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales_invoices (
        name TEXT PRIMARY KEY,
        customer TEXT NOT NULL,
        due_date TEXT NOT NULL,
        outstanding_amount REAL NOT NULL,
        docstatus INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        name TEXT PRIMARY KEY,
        entity_type TEXT NOT NULL,
        docstatus INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contracts (
        name TEXT PRIMARY KEY,
        party TEXT NOT NULL,
        end_date TEXT NOT NULL,
        is_signed BOOLEAN NOT NULL
    )
    "#,
];

pub async fn init_db(database_url: &str) -> Result<SqlitePool, AppError> {
    info!("Initializing database at: {}", database_url);

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    for statement in SCHEMA {
        sqlx::query(statement).execute(&pool).await?;
    }

    info!("Database initialized and schema applied.");

    Ok(pool)
}

/// The record store, shared by every request handler.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl KnowledgeStore for Database {
    async fn candidate_articles(&self, filters: &SearchFilters) -> Result<Vec<KnowledgeArticle>, AppError> {
        candidate_articles(&self.pool, filters).await
    }

    async fn increment_usage(&self, article_id: &str) -> Result<(), AppError> {
        increment_article_usage(&self.pool, article_id).await
    }
}

#[async_trait]
impl OperationalMetrics for Database {
    async fn low_stock_bins(&self) -> Result<u64, AppError> {
        count(
            &self.pool,
            "SELECT COUNT(*) FROM bins WHERE actual_qty <= reorder_level AND reorder_level > 0",
            &[],
        )
        .await
    }

    async fn overdue_invoices(&self) -> Result<u64, AppError> {
        count(
            &self.pool,
            "SELECT COUNT(*) FROM sales_invoices WHERE due_date < ? AND outstanding_amount > 0 AND docstatus = 1",
            &[today()],
        )
        .await
    }

    async fn pending_documents(&self, entity_type: &str) -> Result<u64, AppError> {
        count(
            &self.pool,
            "SELECT COUNT(*) FROM documents WHERE entity_type = ? AND docstatus = 0",
            &[entity_type.to_string()],
        )
        .await
    }

    async fn expiring_contracts(&self, within_days: u32) -> Result<u64, AppError> {
        let horizon = (Local::now().date_naive() + Duration::days(i64::from(within_days)))
            .format("%Y-%m-%d")
            .to_string();
        count(
            &self.pool,
            "SELECT COUNT(*) FROM contracts WHERE is_signed = 1 AND end_date >= ? AND end_date <= ?",
            &[today(), horizon],
        )
        .await
    }
}

fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

async fn count(pool: &SqlitePool, sql: &str, params: &[String]) -> Result<u64, AppError> {
    let mut query = sqlx::query_scalar::<_, i64>(sql);
    for param in params {
        query = query.bind(param);
    }
    let n = query.fetch_one(pool).await?;
    Ok(n.max(0) as u64)
}

// --- Sessions CRUD ---

/// Where and how a new chat was opened.
#[derive(Debug, Clone, Default)]
pub struct NewSession {
    pub user_id: String,
    pub context_entity_type: Option<String>,
    pub context_entity_name: Option<String>,
    pub language: LanguagePreference,
}

pub async fn create_session(pool: &SqlitePool, new: NewSession) -> Result<Session, AppError> {
    let id = Uuid::new_v4().to_string();
    let now = Local::now();
    let title = format!("Chat - {}", now.format("%Y-%m-%d %H:%M"));

    let session = sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (id, title, user_id, started_at, status, context_entity_type,
                              context_entity_name, language, message_count, last_message)
        VALUES (?, ?, ?, ?, 'Active', ?, ?, ?, 0, NULL)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(&title)
    .bind(&new.user_id)
    .bind(now.timestamp())
    .bind(&new.context_entity_type)
    .bind(&new.context_entity_name)
    .bind(new.language.as_str())
    .fetch_one(pool)
    .await?;

    Ok(session)
}

pub async fn get_session(pool: &SqlitePool, id: &str) -> Result<Session, AppError> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Chat Session", id))
}

/// Adds `added` to the message count and remembers the latest user text.
pub async fn bump_session(
    pool: &SqlitePool,
    id: &str,
    added: i64,
    last_message: &str,
) -> Result<(), AppError> {
    let result = sqlx::query(
        "UPDATE sessions SET message_count = message_count + ?, last_message = ? WHERE id = ?",
    )
    .bind(added)
    .bind(last_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Chat Session", id));
    }
    Ok(())
}

// --- Messages CRUD ---

#[derive(Debug, Clone)]
pub struct NewMessage<'a> {
    pub session_id: &'a str,
    pub message_type: MessageType,
    pub content: &'a str,
    pub language: Language,
    pub source: Option<AnswerSource>,
    pub confidence: Option<i64>,
    pub query_intent: Option<&'a str>,
    pub article_id: Option<&'a str>,
}

pub async fn add_message(pool: &SqlitePool, new: NewMessage<'_>) -> Result<Message, AppError> {
    let created_at = Utc::now().timestamp();

    let message = sqlx::query_as::<_, Message>(
        r#"
        INSERT INTO messages (session_id, message_type, content, created_at, language, source,
                              confidence, query_intent, article_id, helpful)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, NULL)
        RETURNING *
        "#,
    )
    .bind(new.session_id)
    .bind(new.message_type)
    .bind(new.content)
    .bind(created_at)
    .bind(new.language)
    .bind(new.source)
    .bind(new.confidence)
    .bind(new.query_intent)
    .bind(new.article_id)
    .fetch_one(pool)
    .await?;

    Ok(message)
}

pub async fn get_message(pool: &SqlitePool, id: i64) -> Result<Message, AppError> {
    sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Chat Message", id.to_string()))
}

pub async fn set_message_helpful(pool: &SqlitePool, id: i64, helpful: bool) -> Result<(), AppError> {
    sqlx::query("UPDATE messages SET helpful = ? WHERE id = ?")
        .bind(if helpful { "Yes" } else { "No" })
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// The first `limit` messages of a session, oldest first.
pub async fn get_session_messages(
    pool: &SqlitePool,
    session_id: &str,
    limit: i64,
) -> Result<Vec<Message>, AppError> {
    let messages = sqlx::query_as::<_, Message>(
        r#"
        SELECT * FROM messages
        WHERE session_id = ?
        ORDER BY created_at ASC, id ASC
        LIMIT ?
        "#,
    )
    .bind(session_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(messages)
}

// --- Feedback ---

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub message_id: i64,
    pub session_id: String,
    pub user_id: String,
    pub rating: Rating,
    pub feedback_text: Option<String>,
    pub correction: Option<String>,
}

pub async fn add_feedback(pool: &SqlitePool, new: NewFeedback) -> Result<Feedback, AppError> {
    let feedback = sqlx::query_as::<_, Feedback>(
        r#"
        INSERT INTO feedback (id, message_id, session_id, user_id, rating, feedback_text, correction, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(new.message_id)
    .bind(&new.session_id)
    .bind(&new.user_id)
    .bind(new.rating)
    .bind(&new.feedback_text)
    .bind(&new.correction)
    .bind(Utc::now().timestamp())
    .fetch_one(pool)
    .await?;

    Ok(feedback)
}

// --- Knowledge Base ---

pub async fn insert_article(pool: &SqlitePool, article: &KnowledgeArticle) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO knowledge_articles (id, title, question, answer, answer_urdu, category, language,
                                        keywords, usage_count, helpful_count, unhelpful_count,
                                        related_entity_type, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&article.id)
    .bind(&article.title)
    .bind(&article.question)
    .bind(&article.answer)
    .bind(&article.answer_urdu)
    .bind(&article.category)
    .bind(article.language)
    .bind(&article.keywords)
    .bind(article.usage_count)
    .bind(article.helpful_count)
    .bind(article.unhelpful_count)
    .bind(&article.related_entity_type)
    .bind(article.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn article_title_exists(pool: &SqlitePool, title: &str) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM knowledge_articles WHERE title = ?")
        .bind(title)
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

pub async fn get_article(pool: &SqlitePool, id: &str) -> Result<KnowledgeArticle, AppError> {
    sqlx::query_as::<_, KnowledgeArticle>("SELECT * FROM knowledge_articles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found("Knowledge Base Article", id))
}

/// Active articles within `filters`, in insertion order.
pub async fn candidate_articles(
    pool: &SqlitePool,
    filters: &SearchFilters,
) -> Result<Vec<KnowledgeArticle>, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM knowledge_articles WHERE is_active = 1");

    if let Some(category) = &filters.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(language) = filters.language {
        builder
            .push(" AND language IN (")
            .push_bind(language.to_string())
            .push(", 'Bilingual')");
    }
    builder.push(" ORDER BY rowid ASC");

    let articles = builder
        .build_query_as::<KnowledgeArticle>()
        .fetch_all(pool)
        .await?;
    Ok(articles)
}

pub async fn increment_article_usage(pool: &SqlitePool, id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE knowledge_articles SET usage_count = usage_count + 1 WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Counts one rating against an article: `helpful_count` when helpful, else `unhelpful_count`.
pub async fn record_article_rating(pool: &SqlitePool, id: &str, helpful: bool) -> Result<(), AppError> {
    let sql = if helpful {
        "UPDATE knowledge_articles SET helpful_count = helpful_count + 1 WHERE id = ?"
    } else {
        "UPDATE knowledge_articles SET unhelpful_count = unhelpful_count + 1 WHERE id = ?"
    };
    let result = sqlx::query(sql).bind(id).execute(pool).await?;
    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Knowledge Base Article", id));
    }
    Ok(())
}

// --- Proactive Rules ---

pub async fn insert_rule(pool: &SqlitePool, rule: &ProactiveRule) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO proactive_rules (name, description, rule_type, target_entity_type, condition_expr,
                                     message, message_urdu, priority, frequency, is_active)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&rule.name)
    .bind(&rule.description)
    .bind(&rule.rule_type)
    .bind(&rule.target_entity_type)
    .bind(&rule.condition_expr)
    .bind(&rule.message)
    .bind(&rule.message_urdu)
    .bind(&rule.priority)
    .bind(&rule.frequency)
    .bind(rule.is_active)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn rule_exists(pool: &SqlitePool, name: &str) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM proactive_rules WHERE name = ?")
        .bind(name)
        .fetch_one(pool)
        .await?;
    Ok(found > 0)
}

pub async fn active_rules(pool: &SqlitePool) -> Result<Vec<ProactiveRule>, AppError> {
    let rules = sqlx::query_as::<_, ProactiveRule>(
        "SELECT * FROM proactive_rules WHERE is_active = 1 ORDER BY rowid ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rules)
}

// --- Settings ---

/// The stored settings, or the defaults (AI disabled) when none were saved.
pub async fn load_settings(pool: &SqlitePool) -> Result<ChatSettings, AppError> {
    let data = sqlx::query_scalar::<_, String>("SELECT data FROM settings WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    match data {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(ChatSettings::default()),
    }
}

/// Validates and stores `settings`. Out-of-range values are rejected with `ConfigurationInvalid`.
pub async fn save_settings(pool: &SqlitePool, settings: ChatSettings) -> Result<ChatSettings, AppError> {
    let settings = settings.validated()?;
    let json = serde_json::to_string(&settings)?;

    sqlx::query(
        "INSERT INTO settings (id, data) VALUES (1, ?) ON CONFLICT(id) DO UPDATE SET data = excluded.data",
    )
    .bind(json)
    .execute(pool)
    .await?;

    info!(enable_ai = settings.enable_ai, provider = %settings.provider, "Settings saved");
    Ok(settings)
}

// --- Operational data ---

pub async fn upsert_bin(
    pool: &SqlitePool,
    item_code: &str,
    warehouse: &str,
    actual_qty: f64,
    reorder_level: f64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO bins (item_code, warehouse, actual_qty, reorder_level) VALUES (?, ?, ?, ?)
        ON CONFLICT(item_code, warehouse) DO UPDATE SET actual_qty = excluded.actual_qty,
                                                        reorder_level = excluded.reorder_level
        "#,
    )
    .bind(item_code)
    .bind(warehouse)
    .bind(actual_qty)
    .bind(reorder_level)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn add_sales_invoice(
    pool: &SqlitePool,
    name: &str,
    customer: &str,
    due_date: &str,
    outstanding_amount: f64,
    docstatus: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO sales_invoices (name, customer, due_date, outstanding_amount, docstatus) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(customer)
    .bind(due_date)
    .bind(outstanding_amount)
    .bind(docstatus)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn add_document(pool: &SqlitePool, name: &str, entity_type: &str, docstatus: i64) -> Result<(), AppError> {
    sqlx::query("INSERT INTO documents (name, entity_type, docstatus) VALUES (?, ?, ?)")
        .bind(name)
        .bind(entity_type)
        .bind(docstatus)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn add_contract(
    pool: &SqlitePool,
    name: &str,
    party: &str,
    end_date: &str,
    is_signed: bool,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO contracts (name, party, end_date, is_signed) VALUES (?, ?, ?, ?)")
        .bind(name)
        .bind(party)
        .bind(end_date)
        .bind(is_signed)
        .execute(pool)
        .await?;
    Ok(())
}
