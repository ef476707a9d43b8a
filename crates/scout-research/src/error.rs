use scout_db::DbError;
use scout_marketplace::MarketplaceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to clear catalog before import: {0}")]
    Clear(#[source] DbError),

    /// A batch failed to commit. Nothing from it was written.
    #[error("batch {batch} failed and was rolled back: {source}")]
    Batch {
        batch: usize,
        #[source]
        source: DbError,
    },

    /// More rows were skipped than the configured limit allows.
    #[error("import aborted: {skipped} malformed rows exceeds the limit of {max_errors}")]
    TooManyErrors { skipped: usize, max_errors: usize },
}

/// Failure of a single search source. The strategy records it and moves on.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("catalog search failed: {0}")]
    Database(#[from] DbError),

    #[error("remote search failed: {0}")]
    Marketplace(#[from] MarketplaceError),
}

#[derive(Debug, Error)]
pub enum ResearchError {
    /// None of the inputs produced a usable product identifier.
    #[error("no usable product identifier could be resolved ({})", .errors.join("; "))]
    NothingResolved { errors: Vec<String> },
}
