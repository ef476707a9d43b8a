//! Audit trail of research runs.

use async_trait::async_trait;
use sqlx::PgPool;

use scout_db::{DbError, SessionCounts};

/// Records the lifecycle of a research run: `pending` at start, then exactly
/// one of `completed` or `failed`.
#[async_trait]
pub trait ResearchLog: Send + Sync {
    /// Opens a pending session and returns its id.
    async fn start(&self, niche: Option<&str>, filters: &serde_json::Value) -> Result<i64, DbError>;

    async fn complete(&self, id: i64, counts: SessionCounts) -> Result<(), DbError>;

    async fn fail(&self, id: i64, error_message: &str, api_calls_made: i32) -> Result<(), DbError>;
}

#[async_trait]
impl ResearchLog for PgPool {
    async fn start(&self, niche: Option<&str>, filters: &serde_json::Value) -> Result<i64, DbError> {
        let row = scout_db::create_research_session(self, niche, filters).await?;
        tracing::debug!(session_id = row.id, public_id = %row.public_id, "research session opened");
        Ok(row.id)
    }

    async fn complete(&self, id: i64, counts: SessionCounts) -> Result<(), DbError> {
        scout_db::complete_research_session(self, id, counts).await
    }

    async fn fail(&self, id: i64, error_message: &str, api_calls_made: i32) -> Result<(), DbError> {
        scout_db::fail_research_session(self, id, error_message, api_calls_made).await
    }
}
