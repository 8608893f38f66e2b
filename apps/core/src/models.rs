use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// One of the two reply languages the assistant speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
pub enum Language {
    English,
    Urdu,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::English => write!(f, "English"),
            Language::Urdu => write!(f, "Urdu"),
        }
    }
}

/// Language requested by the caller. `AutoDetect` is resolved before answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LanguagePreference {
    English,
    Urdu,
    #[default]
    #[serde(rename = "Auto Detect")]
    AutoDetect,
}

impl LanguagePreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguagePreference::English => "English",
            LanguagePreference::Urdu => "Urdu",
            LanguagePreference::AutoDetect => "Auto Detect",
        }
    }

    /// The fixed language, if one was requested.
    pub fn fixed(&self) -> Option<Language> {
        match self {
            LanguagePreference::English => Some(Language::English),
            LanguagePreference::Urdu => Some(Language::Urdu),
            LanguagePreference::AutoDetect => None,
        }
    }
}

/// Language tag carried by a knowledge-base article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum ArticleLanguage {
    English,
    Urdu,
    Bilingual,
}

impl ArticleLanguage {
    /// Whether an article tagged with `self` may answer in `language`.
    pub fn admits(&self, language: Language) -> bool {
        match self {
            ArticleLanguage::Bilingual => true,
            ArticleLanguage::English => language == Language::English,
            ArticleLanguage::Urdu => language == Language::Urdu,
        }
    }
}

/// Which pipeline stage produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum AnswerSource {
    #[serde(rename = "Knowledge Base")]
    #[sqlx(rename = "Knowledge Base")]
    KnowledgeBase,
    #[serde(rename = "LLM")]
    #[sqlx(rename = "LLM")]
    Llm,
    #[serde(rename = "Rule-Based")]
    #[sqlx(rename = "Rule-Based")]
    RuleBased,
    #[serde(rename = "Context-Aware")]
    #[sqlx(rename = "Context-Aware")]
    ContextAware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum MessageType {
    User,
    Bot,
}

/// User rating attached to a bot message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Rating {
    Helpful,
    #[serde(rename = "Not Helpful")]
    #[sqlx(rename = "Not Helpful")]
    NotHelpful,
    #[serde(rename = "Partially Helpful")]
    #[sqlx(rename = "Partially Helpful")]
    PartiallyHelpful,
}

impl FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "helpful" => Ok(Rating::Helpful),
            "not helpful" | "nothelpful" => Ok(Rating::NotHelpful),
            "partially helpful" | "partiallyhelpful" => Ok(Rating::PartiallyHelpful),
            other => Err(format!("unknown rating: {}", other)),
        }
    }
}

/// Urgency of a proactive suggestion. Lower rank sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Critical" => Ok(Priority::Critical),
            "High" => Ok(Priority::High),
            "Medium" => Ok(Priority::Medium),
            "Low" => Ok(Priority::Low),
            other => Err(format!("unknown priority: {}", other)),
        }
    }
}

/// Kinds of proactive checks the evaluator knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    LowStockAlert,
    OverdueInvoice,
    MissingDocument,
    ExpiringContract,
}

impl FromStr for RuleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low Stock Alert" => Ok(RuleType::LowStockAlert),
            "Overdue Invoice" => Ok(RuleType::OverdueInvoice),
            "Missing Document" => Ok(RuleType::MissingDocument),
            "Expiring Contract" => Ok(RuleType::ExpiringContract),
            other => Err(format!("unknown rule type: {}", other)),
        }
    }
}

/// A curated question/answer record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KnowledgeArticle {
    pub id: String,
    pub title: String,
    pub question: String,
    /// Default (English) answer text.
    pub answer: String,
    pub answer_urdu: Option<String>,
    pub category: String,
    pub language: ArticleLanguage,
    pub keywords: Json<Vec<String>>,
    pub usage_count: i64,
    pub helpful_count: i64,
    pub unhelpful_count: i64,
    pub related_entity_type: Option<String>,
    pub is_active: bool,
}

impl KnowledgeArticle {
    /// Answer text for `language`, falling back to the default answer when no
    /// Urdu translation is stored.
    pub fn answer_for(&self, language: Language) -> &str {
        match (language, self.answer_urdu.as_deref()) {
            (Language::Urdu, Some(urdu)) if !urdu.trim().is_empty() => urdu,
            _ => &self.answer,
        }
    }
}

/// An article paired with the relevance score the matcher gave it.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredArticle {
    pub article: KnowledgeArticle,
    pub relevance_score: u32,
}

/// The single output contract of the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub source: AnswerSource,
    /// Heuristic trust score, always within 0..=100.
    pub confidence: u8,
    pub suggestions: Vec<String>,
}

/// Represents a chat session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    /// The unique identifier for the session (UUID).
    pub id: String,
    pub title: String,
    pub user_id: String,
    /// Unix timestamp of when the session was started.
    pub started_at: i64,
    pub status: String,
    /// Entity type of the screen the chat was opened from.
    pub context_entity_type: Option<String>,
    pub context_entity_name: Option<String>,
    pub language: String,
    pub message_count: i64,
    pub last_message: Option<String>,
}

/// Represents a single message within a chat session.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    pub id: i64,
    pub session_id: String,
    pub message_type: MessageType,
    pub content: String,
    /// Unix timestamp of when the message was created.
    pub created_at: i64,
    pub language: Language,
    pub source: Option<AnswerSource>,
    pub confidence: Option<i64>,
    pub query_intent: Option<String>,
    /// Article that produced a knowledge-base answer.
    pub article_id: Option<String>,
    pub helpful: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub id: String,
    pub message_id: i64,
    pub session_id: String,
    pub user_id: String,
    pub rating: Rating,
    pub feedback_text: Option<String>,
    pub correction: Option<String>,
    pub created_at: i64,
}

/// A standing condition checked against operational data.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProactiveRule {
    pub name: String,
    pub description: Option<String>,
    pub rule_type: String,
    pub target_entity_type: Option<String>,
    pub condition_expr: String,
    pub message: String,
    pub message_urdu: Option<String>,
    pub priority: String,
    pub frequency: Option<String>,
    pub is_active: bool,
}

impl ProactiveRule {
    /// Sort rank of the rule's priority; unknown priorities sort last.
    pub fn priority_rank(&self) -> u8 {
        self.priority
            .parse::<Priority>()
            .map(|p| p.rank())
            .unwrap_or(4)
    }
}

/// A fired proactive rule, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub rule: String,
    pub message: String,
    pub message_urdu: Option<String>,
    pub priority: String,
    pub rule_type: String,
}
