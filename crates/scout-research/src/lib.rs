//! Research pipeline: bulk catalog import, hybrid search, and scored
//! product research over the remote marketplace.

pub mod error;
pub mod importer;
mod metered;
pub mod orchestrator;
pub mod search;
pub mod session_log;

pub use error::{ImportError, ResearchError, SourceError};
pub use importer::{import_batch, CatalogSink, ImportMode, ImportOptions, ImportSummary};
pub use orchestrator::{extract_asin, ResearchInput, ResearchReport, ResearchRequest, Researcher};
pub use search::{
    search_local, tokenize_query, LocalCatalogSource, LocalSearch, RemoteSearchSource, SearchHit,
    SearchResponse, SearchSource, SearchStrategy, SourceResult,
};
pub use session_log::ResearchLog;
