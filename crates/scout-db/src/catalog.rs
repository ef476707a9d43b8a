//! Database operations for the `catalog_products` table.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use scout_core::{CatalogProduct, CatalogRecord, Marketplace};

use crate::DbError;

const CATALOG_COLUMNS: &str =
    "id, title, url, price, currency_code, category, marketplace, is_active, updated_at";

/// A row from the `catalog_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CatalogProductRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: Option<Decimal>,
    pub currency_code: String,
    pub category: Option<String>,
    pub marketplace: String,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogProductRow> for CatalogProduct {
    type Error = DbError;

    fn try_from(row: CatalogProductRow) -> Result<Self, Self::Error> {
        let marketplace: Marketplace =
            row.marketplace
                .parse()
                .map_err(|e: scout_core::CoreError| DbError::InvalidRow {
                    table: "catalog_products",
                    reason: e.to_string(),
                })?;
        Ok(CatalogProduct {
            id: row.id,
            title: row.title,
            url: row.url,
            price: row.price,
            currency_code: row.currency_code,
            category: row.category,
            marketplace,
            is_active: row.is_active,
            updated_at: row.updated_at,
        })
    }
}

/// Deletes every catalog row. Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn clear_catalog(pool: &PgPool) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM catalog_products")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Upserts `records` inside a single transaction.
///
/// Conflicts on `id` overwrite every mutable field, reactivate the row, and
/// refresh `updated_at`. If any row fails the whole batch is rolled back and
/// nothing from it is visible.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any statement or the commit fails.
pub async fn upsert_catalog_batch(pool: &PgPool, records: &[CatalogRecord]) -> Result<usize, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO catalog_products \
                 (id, title, url, price, currency_code, category, marketplace, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, TRUE) \
             ON CONFLICT (id) DO UPDATE SET \
                 title         = EXCLUDED.title, \
                 url           = EXCLUDED.url, \
                 price         = EXCLUDED.price, \
                 currency_code = EXCLUDED.currency_code, \
                 category      = EXCLUDED.category, \
                 marketplace   = EXCLUDED.marketplace, \
                 is_active     = TRUE, \
                 updated_at    = NOW()",
        )
        .bind(&record.id)
        .bind(&record.title)
        .bind(&record.url)
        .bind(record.price)
        .bind(&record.currency_code)
        .bind(&record.category)
        .bind(record.marketplace.as_str())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(rows = records.len(), "catalog batch committed");

    Ok(records.len())
}

/// Escapes `LIKE` metacharacters so a token only ever matches literally.
#[must_use]
pub fn escape_like(token: &str) -> String {
    let mut escaped = String::with_capacity(token.len());
    for ch in token.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Active catalog rows whose title or category contains any of `tokens`,
/// case-insensitively. At most `limit` rows, ordered by `id`.
///
/// Returns an empty list without querying when `tokens` is empty.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::InvalidRow`]
/// if a stored marketplace value is not recognized.
pub async fn search_catalog(
    pool: &PgPool,
    tokens: &[String],
    limit: i64,
) -> Result<Vec<CatalogProduct>, DbError> {
    if tokens.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT ");
    qb.push(CATALOG_COLUMNS)
        .push(" FROM catalog_products WHERE is_active AND (");

    for (i, token) in tokens.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        let pattern = format!("%{}%", escape_like(token));
        qb.push("title ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR category ILIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\'");
    }

    qb.push(") ORDER BY id LIMIT ").push_bind(limit);

    let rows = qb
        .build_query_as::<CatalogProductRow>()
        .fetch_all(pool)
        .await?;

    rows.into_iter().map(CatalogProduct::try_from).collect()
}

/// Fetches a single catalog row by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row has the given `id`.
pub async fn get_catalog_product(pool: &PgPool, id: &str) -> Result<CatalogProduct, DbError> {
    let row = sqlx::query_as::<_, CatalogProductRow>(&format!(
        "SELECT {CATALOG_COLUMNS} FROM catalog_products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    CatalogProduct::try_from(row)
}

/// Total number of catalog rows, active or not.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_catalog(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM catalog_products")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
