//! Postgres persistence for the local product catalog and the research
//! session audit log.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use scout_core::AppConfig;

pub mod catalog;
pub mod research_sessions;

pub use catalog::{
    clear_catalog, count_catalog, escape_like, get_catalog_product, search_catalog,
    upsert_catalog_batch, CatalogProductRow,
};
pub use research_sessions::{
    complete_research_session, create_research_session, fail_research_session,
    get_research_session, ResearchSessionRow, SessionCounts,
};

// Resolves to <workspace-root>/migrations/
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(10),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout: Duration::from_secs(config.db_acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("record not found")]
    NotFound,
    #[error("research session {id} is not in '{expected_status}' status")]
    InvalidSessionTransition {
        id: i64,
        expected_status: &'static str,
    },
    /// A stored row could not be mapped back into a domain type.
    #[error("invalid row in {table}: {reason}")]
    InvalidRow { table: &'static str, reason: String },
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Opens a pool against `database_url`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect(database_url)
        .await?;
    tracing::debug!(
        max_connections = config.max_connections,
        "database pool connected"
    );
    Ok(pool)
}

/// Applies pending migrations and returns how many were newly applied.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if any migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let before = applied_migrations(pool).await;
    MIGRATOR.run(pool).await?;
    let after = applied_migrations(pool).await;

    let applied = usize::try_from(after.saturating_sub(before)).unwrap_or(0);
    if applied > 0 {
        tracing::info!(applied, "database migrations applied");
    }
    Ok(applied)
}

// The bookkeeping table is missing on a fresh database; count that as zero.
async fn applied_migrations(pool: &PgPool) -> i64 {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM _sqlx_migrations WHERE success")
        .fetch_one(pool)
        .await
        .unwrap_or(0)
}

/// Round-trips `SELECT 1` through the pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database is unreachable.
pub async fn health_check(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
