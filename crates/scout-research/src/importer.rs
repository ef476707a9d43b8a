//! Bulk catalog import from delimited text.
//!
//! Rows are read with the `csv` crate (header row, RFC 4180 quoting) and
//! flushed to a [`CatalogSink`] in fixed-size batches, each one committed
//! all-or-nothing. Malformed rows are skipped with a warning and counted;
//! too many of them abort the run.

use std::collections::HashSet;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use scout_core::{AppConfig, CatalogRecord, Marketplace};
use scout_db::DbError;

use crate::error::ImportError;

/// Positional fields every data row must carry:
/// `id, title, url, price, currencyCode, category`.
const MIN_FIELDS: usize = 6;
const DEFAULT_CURRENCY: &str = "USD";

/// Write side of the catalog store.
#[async_trait]
pub trait CatalogSink: Send + Sync {
    /// Removes every catalog row, returning how many were deleted.
    async fn clear(&self) -> Result<u64, DbError>;

    /// Upserts `records` in one transaction.
    async fn upsert_batch(&self, records: &[CatalogRecord]) -> Result<usize, DbError>;
}

#[async_trait]
impl CatalogSink for PgPool {
    async fn clear(&self) -> Result<u64, DbError> {
        scout_db::clear_catalog(self).await
    }

    async fn upsert_batch(&self, records: &[CatalogRecord]) -> Result<usize, DbError> {
        scout_db::upsert_catalog_batch(self, records).await
    }
}

/// Whether an import replaces the catalog or merges into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Clear the table, then import. Two partial files do not merge.
    #[default]
    FullRefresh,
    /// Upsert only; rows absent from the source are left untouched.
    Merge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub mode: ImportMode,
    pub batch_size: usize,
    pub max_errors: usize,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            mode: ImportMode::FullRefresh,
            batch_size: 100,
            max_errors: 10,
        }
    }
}

impl ImportOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig, mode: ImportMode) -> Self {
        Self {
            mode,
            batch_size: config.import_batch_size.max(1),
            max_errors: config.import_max_errors,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Distinct catalog ids written by this run.
    pub success_count: usize,
    /// Rows skipped as malformed.
    pub error_count: usize,
    pub batches_committed: usize,
    /// Rows removed by the initial clear (full refresh only).
    pub rows_cleared: u64,
}

/// Imports `source` into `sink`.
///
/// # Errors
///
/// - [`ImportError::Clear`] if the full-refresh clear fails.
/// - [`ImportError::Batch`] if a batch fails to commit. Earlier batches stay
///   committed.
/// - [`ImportError::TooManyErrors`] once more than `max_errors` rows have
///   been skipped.
pub async fn import_batch<S>(
    sink: &S,
    source: &str,
    options: &ImportOptions,
) -> Result<ImportSummary, ImportError>
where
    S: CatalogSink + ?Sized,
{
    let batch_size = options.batch_size.max(1);
    let mut summary = ImportSummary::default();

    if options.mode == ImportMode::FullRefresh {
        summary.rows_cleared = sink.clear().await.map_err(ImportError::Clear)?;
        tracing::info!(rows = summary.rows_cleared, "catalog cleared for full refresh");
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source.as_bytes());

    let mut written: HashSet<String> = HashSet::new();
    let mut batch: Vec<CatalogRecord> = Vec::with_capacity(batch_size);

    for result in reader.records() {
        let parsed = match result {
            Ok(record) => {
                let line = record.position().map_or(0, csv::Position::line);
                parse_row(&record).map_err(|reason| (line, reason))
            }
            Err(err) => {
                let line = err.position().map_or(0, csv::Position::line);
                Err((line, err.to_string()))
            }
        };

        match parsed {
            Ok(record) => {
                batch.push(record);
                if batch.len() >= batch_size {
                    flush(sink, &mut batch, &mut written, &mut summary).await?;
                }
            }
            Err((line, reason)) => {
                summary.error_count += 1;
                tracing::warn!(line, %reason, "skipping malformed catalog row");
                if summary.error_count > options.max_errors {
                    return Err(ImportError::TooManyErrors {
                        skipped: summary.error_count,
                        max_errors: options.max_errors,
                    });
                }
            }
        }
    }

    flush(sink, &mut batch, &mut written, &mut summary).await?;
    summary.success_count = written.len();

    tracing::info!(
        imported = summary.success_count,
        skipped = summary.error_count,
        batches = summary.batches_committed,
        mode = ?options.mode,
        "catalog import finished"
    );
    Ok(summary)
}

async fn flush<S>(
    sink: &S,
    batch: &mut Vec<CatalogRecord>,
    written: &mut HashSet<String>,
    summary: &mut ImportSummary,
) -> Result<(), ImportError>
where
    S: CatalogSink + ?Sized,
{
    if batch.is_empty() {
        return Ok(());
    }
    let number = summary.batches_committed + 1;
    sink.upsert_batch(batch)
        .await
        .map_err(|source| ImportError::Batch {
            batch: number,
            source,
        })?;
    summary.batches_committed = number;
    written.extend(batch.drain(..).map(|r| r.id));
    Ok(())
}

/// Turns one data row into a catalog record, or explains why it is skipped.
fn parse_row(record: &csv::StringRecord) -> Result<CatalogRecord, String> {
    if record.len() < MIN_FIELDS {
        return Err(format!(
            "expected at least {MIN_FIELDS} fields, found {}",
            record.len()
        ));
    }

    let field = |i: usize| record.get(i).unwrap_or_default();
    let required = |i: usize, name: &str| {
        let value = field(i);
        if value.is_empty() {
            Err(format!("missing required field '{name}'"))
        } else {
            Ok(value.to_string())
        }
    };

    let id = required(0, "id")?;
    let title = required(1, "title")?;
    let url = required(2, "url")?;

    let price = match field(3) {
        "" => None,
        raw => Some(Decimal::from_str(raw).map_err(|e| format!("invalid price '{raw}': {e}"))?),
    };
    let currency_code = match field(4) {
        "" => DEFAULT_CURRENCY.to_string(),
        raw => raw.to_ascii_uppercase(),
    };
    let category = Some(field(5).to_string()).filter(|c| !c.is_empty());
    let marketplace = Marketplace::from_import_field(field(6));

    Ok(CatalogRecord {
        id,
        title,
        url,
        price,
        currency_code,
        category,
        marketplace,
    })
}

#[cfg(test)]
#[path = "importer_test.rs"]
mod tests;
