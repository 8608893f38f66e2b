use crate::actors::messages::AppError;
use crate::brain::matcher::SearchFilters;
use crate::models::KnowledgeArticle;
use async_trait::async_trait;

/// Read access to knowledge-base articles plus the usage counter.
///
/// This abstracts the record store so the resolver can run against SQLite in
/// production and an in-memory list in tests.
#[async_trait]
pub trait KnowledgeStore: Send + Sync + 'static {
    /// Active articles satisfying `filters`, in stable retrieval order.
    async fn candidate_articles(&self, filters: &SearchFilters) -> Result<Vec<KnowledgeArticle>, AppError>;

    /// Adds one to the article's usage counter.
    async fn increment_usage(&self, article_id: &str) -> Result<(), AppError>;
}

/// Live aggregates over operational data that proactive rules test against.
#[async_trait]
pub trait OperationalMetrics: Send + Sync + 'static {
    /// Bins at or below a positive reorder level.
    async fn low_stock_bins(&self) -> Result<u64, AppError>;

    /// Submitted invoices past due with an outstanding amount.
    async fn overdue_invoices(&self) -> Result<u64, AppError>;

    /// Draft documents of `entity_type` still awaiting approval.
    async fn pending_documents(&self, entity_type: &str) -> Result<u64, AppError>;

    /// Signed contracts ending within `within_days` days from today.
    async fn expiring_contracts(&self, within_days: u32) -> Result<u64, AppError>;
}
