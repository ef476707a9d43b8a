//! `catalog` command handlers.

use std::path::Path;

use anyhow::Context;
use scout_research::{import_batch, ImportMode, ImportOptions};

use crate::output::print_json;

/// Reads `path` and imports it into the catalog, printing the summary.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the import aborts.
pub(crate) async fn run_import(
    pool: &sqlx::PgPool,
    config: &scout_core::AppConfig,
    path: &Path,
    merge: bool,
) -> anyhow::Result<()> {
    let source = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    let mode = if merge {
        ImportMode::Merge
    } else {
        ImportMode::FullRefresh
    };
    let options = ImportOptions::from_app_config(config, mode);

    tracing::info!(path = %path.display(), ?mode, "importing catalog");
    let summary = import_batch(pool, &source, &options).await?;
    print_json(&summary)
}
