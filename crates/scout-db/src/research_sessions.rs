//! Database operations for `research_sessions`, the audit trail of
//! orchestrated research runs.
//!
//! A session is created `pending` and moves exactly once, to either
//! `completed` or `failed`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const SESSION_COLUMNS: &str = "id, public_id, niche, filters, total_products_found, \
     products_stored, api_calls_made, status, error_message, created_at, completed_at";

/// A row from the `research_sessions` table.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ResearchSessionRow {
    pub id: i64,
    pub public_id: Uuid,
    pub niche: Option<String>,
    pub filters: serde_json::Value,
    pub total_products_found: i32,
    pub products_stored: i32,
    pub api_calls_made: i32,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counters written when a session completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionCounts {
    pub total_products_found: i32,
    pub products_stored: i32,
    pub api_calls_made: i32,
}

/// Creates a session in `pending` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_research_session(
    pool: &PgPool,
    niche: Option<&str>,
    filters: &serde_json::Value,
) -> Result<ResearchSessionRow, DbError> {
    let row = sqlx::query_as::<_, ResearchSessionRow>(&format!(
        "INSERT INTO research_sessions (public_id, niche, filters, status) \
         VALUES ($1, $2, $3, 'pending') \
         RETURNING {SESSION_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(niche)
    .bind(filters)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a pending session `completed` and records its counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidSessionTransition`] if the session is not
/// pending, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_research_session(
    pool: &PgPool,
    id: i64,
    counts: SessionCounts,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE research_sessions \
         SET status = 'completed', completed_at = NOW(), \
             total_products_found = $1, products_stored = $2, api_calls_made = $3 \
         WHERE id = $4 AND status = 'pending'",
    )
    .bind(counts.total_products_found)
    .bind(counts.products_stored)
    .bind(counts.api_calls_made)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSessionTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Marks a pending session `failed` with `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSessionTransition`] if the session is not
/// pending, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_research_session(
    pool: &PgPool,
    id: i64,
    error_message: &str,
    api_calls_made: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE research_sessions \
         SET status = 'failed', completed_at = NOW(), error_message = $1, api_calls_made = $2 \
         WHERE id = $3 AND status = 'pending'",
    )
    .bind(error_message)
    .bind(api_calls_made)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSessionTransition {
            id,
            expected_status: "pending",
        });
    }

    Ok(())
}

/// Fetches a session by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`.
pub async fn get_research_session(pool: &PgPool, id: i64) -> Result<ResearchSessionRow, DbError> {
    let row = sqlx::query_as::<_, ResearchSessionRow>(&format!(
        "SELECT {SESSION_COLUMNS} FROM research_sessions WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}
