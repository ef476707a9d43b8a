//! Keyword search over ordered sources.
//!
//! A [`SearchStrategy`] walks its sources in order and stops at the first
//! one that returns anything. The default hybrid strategy tries the free
//! local catalog before the rate-limited remote index.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use sqlx::PgPool;

use scout_core::{CatalogProduct, Product};
use scout_db::DbError;
use scout_marketplace::MarketplaceApi;

use crate::error::SourceError;

/// Shortest token length (in characters) that is still searched.
const MIN_TOKEN_CHARS: usize = 3;

const QUERY_TOO_SHORT: &str = "query too short: no search term has more than two characters";

/// Splits `query` into lowercase search terms longer than two characters.
/// Surrounding punctuation is stripped and duplicates removed.
#[must_use]
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|token| token.chars().count() >= MIN_TOKEN_CHARS)
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

/// Outcome of a local catalog search.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalSearch {
    Matches(Vec<CatalogProduct>),
    /// Every term was discarded; the catalog was not queried.
    QueryTooShort,
}

/// Searches active catalog rows whose title or category contains any token.
///
/// # Errors
///
/// Returns [`DbError`] if the catalog query fails.
pub async fn search_local(pool: &PgPool, query: &str, limit: usize) -> Result<LocalSearch, DbError> {
    let tokens = tokenize_query(query);
    if tokens.is_empty() {
        return Ok(LocalSearch::QueryTooShort);
    }
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let rows = scout_db::search_catalog(pool, &tokens, limit).await?;
    Ok(LocalSearch::Matches(rows))
}

/// One product found by a search, tagged with where it came from.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "origin", rename_all = "lowercase")]
pub enum SearchHit {
    Catalog(CatalogProduct),
    Remote(Product),
}

/// What one source produced. An empty `hits` lets the strategy continue.
#[derive(Debug, Default)]
pub struct SourceResult {
    pub hits: Vec<SearchHit>,
    pub notice: Option<String>,
}

#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Short label reported as the response `source`.
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str, limit: usize) -> Result<SourceResult, SourceError>;
}

/// The local catalog store.
pub struct LocalCatalogSource {
    pool: PgPool,
}

impl LocalCatalogSource {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SearchSource for LocalCatalogSource {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SourceResult, SourceError> {
        Ok(match search_local(&self.pool, query, limit).await? {
            LocalSearch::Matches(rows) => SourceResult {
                hits: rows.into_iter().map(SearchHit::Catalog).collect(),
                notice: None,
            },
            LocalSearch::QueryTooShort => SourceResult {
                hits: Vec::new(),
                notice: Some(QUERY_TOO_SHORT.to_string()),
            },
        })
    }
}

/// Keyword search against the remote marketplace index.
pub struct RemoteSearchSource {
    api: Arc<dyn MarketplaceApi>,
}

impl RemoteSearchSource {
    #[must_use]
    pub fn new(api: Arc<dyn MarketplaceApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SearchSource for RemoteSearchSource {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<SourceResult, SourceError> {
        let products = self.api.search(query, limit).await?;
        Ok(SourceResult {
            hits: products.into_iter().map(SearchHit::Remote).collect(),
            notice: None,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub query: String,
    /// Name of the source that produced `products`, or `"none"`.
    pub source: String,
    pub products: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub errors: Vec<String>,
}

/// Ordered list of search sources.
pub struct SearchStrategy {
    sources: Vec<Box<dyn SearchSource>>,
}

impl SearchStrategy {
    #[must_use]
    pub fn new(sources: Vec<Box<dyn SearchSource>>) -> Self {
        Self { sources }
    }

    /// Local catalog first, remote index only when the catalog has nothing.
    #[must_use]
    pub fn hybrid(pool: PgPool, api: Arc<dyn MarketplaceApi>) -> Self {
        Self::new(vec![
            Box::new(LocalCatalogSource::new(pool)),
            Box::new(RemoteSearchSource::new(api)),
        ])
    }

    /// Tries each source in order until one returns hits. Source errors are
    /// recorded in the response and never stop the walk.
    pub async fn run(&self, query: &str, limit: usize) -> SearchResponse {
        let mut response = SearchResponse {
            query: query.to_string(),
            source: "none".to_string(),
            ..SearchResponse::default()
        };

        for source in &self.sources {
            match source.search(query, limit).await {
                Ok(result) => {
                    if response.notice.is_none() {
                        response.notice = result.notice;
                    }
                    if !result.hits.is_empty() {
                        response.source = source.name().to_string();
                        response.products = result.hits;
                        response.products.truncate(limit);
                        break;
                    }
                    tracing::debug!(source = source.name(), %query, "no hits, trying next source");
                }
                Err(err) => {
                    tracing::warn!(source = source.name(), %query, error = %err, "search source failed");
                    response.errors.push(format!("{}: {err}", source.name()));
                }
            }
        }

        response
    }
}
