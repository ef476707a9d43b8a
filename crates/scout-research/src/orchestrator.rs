//! Unified entry points: keyword/URL search and scored product research.

use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use scout_core::{
    compute_market_insights, MarketInsights, Marketplace, Product, Scorable, ScoredProduct,
    ScoringEngine,
};
use scout_db::SessionCounts;
use scout_marketplace::{marketplace_for_url, MarketplaceApi, MAX_BATCH_SIZE};

use crate::error::ResearchError;
use crate::metered::MeteredApi;
use crate::search::{SearchHit, SearchResponse, SearchStrategy};
use crate::session_log::ResearchLog;

static AMAZON_PATH_ASIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/(?:dp|gp/product|gp/aw/d|product)/([A-Z0-9]{10})(?:[/?#]|$)")
        .expect("valid regex")
});

static BARE_ASIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{10}$").expect("valid regex"));

/// Extracts the ASIN from an Amazon product URL path, if present.
#[must_use]
pub fn extract_asin(url: &str) -> Option<String> {
    AMAZON_PATH_ASIN
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// The ASIN of `url` when it points at an Amazon host. Any other host goes
/// through the marketplace's URL indexing even if its path looks similar.
fn amazon_asin(url: &str) -> Option<String> {
    matches!(marketplace_for_url(url), Ok(Marketplace::Amazon))
        .then(|| extract_asin(url))
        .flatten()
}

/// One research input: a product URL or a bare ASIN.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asin: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub niche: Option<String>,
    pub inputs: Vec<ResearchInput>,
    /// Keep at most this many scored products, highest score first.
    #[serde(default)]
    pub max_results: Option<usize>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    /// Scored products after price filters and `max_results`, best first.
    pub products: Vec<ScoredProduct<Product>>,
    /// Aggregates over every fetched product, before filtering.
    pub insights: MarketInsights,
    pub errors: Vec<String>,
    pub total_found: usize,
    pub api_calls_made: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

/// Composes search, remote fetch, scoring, and the optional audit log.
pub struct Researcher {
    api: Arc<dyn MarketplaceApi>,
    strategy: SearchStrategy,
    engine: ScoringEngine,
    log: Option<Arc<dyn ResearchLog>>,
}

impl Researcher {
    #[must_use]
    pub fn new(api: Arc<dyn MarketplaceApi>, strategy: SearchStrategy, engine: ScoringEngine) -> Self {
        Self {
            api,
            strategy,
            engine,
            log: None,
        }
    }

    #[must_use]
    pub fn with_log(mut self, log: Arc<dyn ResearchLog>) -> Self {
        self.log = Some(log);
        self
    }

    #[must_use]
    pub fn engine(&self) -> &ScoringEngine {
        &self.engine
    }

    /// An absolute http(s) URL is fetched as a single product; anything else
    /// is a keyword query run through the search strategy.
    pub async fn search_unified(&self, query: &str, limit: usize) -> SearchResponse {
        let query = query.trim();
        if marketplace_for_url(query).is_err() {
            return self.strategy.run(query, limit).await;
        }

        let mut response = SearchResponse {
            query: query.to_string(),
            source: "url".to_string(),
            ..SearchResponse::default()
        };
        match self.api.get_by_url(query).await {
            Ok(product) => response.products.push(SearchHit::Remote(product)),
            Err(err) => {
                tracing::warn!(url = %query, error = %err, "URL lookup failed");
                response.errors.push(format!("{query}: {err}"));
            }
        }
        response
    }

    /// Resolves every input to an identifier, batch-fetches them, and scores
    /// the results.
    ///
    /// Per-input and per-identifier failures are reported in
    /// [`ResearchReport::errors`].
    ///
    /// # Errors
    ///
    /// Returns [`ResearchError::NothingResolved`] only when no input yields a
    /// usable identifier.
    pub async fn research_products(
        &self,
        request: &ResearchRequest,
    ) -> Result<ResearchReport, ResearchError> {
        let session_id = self.open_session(request).await;
        let api = MeteredApi::new(self.api.as_ref());
        let mut errors = Vec::new();

        let ids = resolve_identifiers(&api, &request.inputs, &mut errors).await;
        if ids.is_empty() {
            let err = ResearchError::NothingResolved { errors };
            self.fail_session(session_id, &err.to_string(), api.calls())
                .await;
            return Err(err);
        }

        let mut products = Vec::new();
        for (marketplace, group) in group_by_marketplace(ids) {
            for chunk in group.chunks(MAX_BATCH_SIZE) {
                match api.get_by_ids(chunk, marketplace).await {
                    Ok(batch) => {
                        products.extend(batch.products);
                        errors.extend(batch.errors);
                    }
                    Err(err) => errors.push(format!("{marketplace} batch: {err}")),
                }
            }
        }

        let total_found = products.len();
        let insights = compute_market_insights(&products);
        let mut scored: Vec<ScoredProduct<Product>> = self
            .engine
            .score_all(products)
            .into_iter()
            .filter(|s| within_price(&s.product, request.min_price, request.max_price))
            .collect();
        if let Some(max) = request.max_results {
            scored.truncate(max);
        }

        let report = ResearchReport {
            products: scored,
            insights,
            errors,
            total_found,
            api_calls_made: api.calls(),
            session_id,
        };
        self.complete_session(&report).await;

        tracing::info!(
            niche = request.niche.as_deref().unwrap_or(""),
            inputs = request.inputs.len(),
            found = report.total_found,
            returned = report.products.len(),
            errors = report.errors.len(),
            api_calls = report.api_calls_made,
            "research completed"
        );
        Ok(report)
    }

    async fn open_session(&self, request: &ResearchRequest) -> Option<i64> {
        let log = self.log.as_ref()?;
        let filters = serde_json::json!({
            "inputs": request.inputs,
            "max_results": request.max_results,
            "min_price": request.min_price,
            "max_price": request.max_price,
        });
        match log.start(request.niche.as_deref(), &filters).await {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::warn!(error = %err, "failed to open research session");
                None
            }
        }
    }

    async fn complete_session(&self, report: &ResearchReport) {
        let (Some(log), Some(id)) = (&self.log, report.session_id) else {
            return;
        };
        let counts = SessionCounts {
            total_products_found: saturating_i32(report.total_found),
            products_stored: 0,
            api_calls_made: saturating_i32(report.api_calls_made),
        };
        if let Err(err) = log.complete(id, counts).await {
            tracing::warn!(session_id = id, error = %err, "failed to complete research session");
        }
    }

    async fn fail_session(&self, session_id: Option<i64>, message: &str, api_calls: u32) {
        let (Some(log), Some(id)) = (&self.log, session_id) else {
            return;
        };
        if let Err(err) = log
            .fail(id, message, saturating_i32(api_calls))
            .await
        {
            tracing::warn!(session_id = id, error = %err, "failed to mark research session failed");
        }
    }
}

/// Maps inputs to `(marketplace, id)` pairs, deduplicated in first-seen
/// order. Unresolvable inputs are appended to `errors`.
async fn resolve_identifiers(
    api: &dyn MarketplaceApi,
    inputs: &[ResearchInput],
    errors: &mut Vec<String>,
) -> Vec<(Marketplace, String)> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for input in inputs {
        let resolved = match (input.asin.as_deref(), input.url.as_deref()) {
            (Some(asin), _) if !asin.trim().is_empty() => {
                let raw = asin.trim();
                let asin = raw.to_ascii_uppercase();
                if BARE_ASIN.is_match(&asin) {
                    Ok((Marketplace::Amazon, asin))
                } else {
                    Err(format!("{raw}: not a valid ASIN"))
                }
            }
            (_, Some(url)) if !url.trim().is_empty() => {
                let url = url.trim();
                match amazon_asin(url) {
                    Some(asin) => Ok((Marketplace::Amazon, asin)),
                    None => api
                        .request_by_url(url)
                        .await
                        .map(|r| (r.marketplace, r.product_id))
                        .map_err(|e| format!("{url}: {e}")),
                }
            }
            _ => Err("input has neither a url nor an asin".to_string()),
        };

        match resolved {
            Ok(pair) => {
                if seen.insert(pair.clone()) {
                    ids.push(pair);
                }
            }
            Err(reason) => {
                tracing::warn!(%reason, "research input could not be resolved");
                errors.push(reason);
            }
        }
    }

    ids
}

/// Groups identifiers by marketplace, keeping first-seen order of both.
fn group_by_marketplace(ids: Vec<(Marketplace, String)>) -> Vec<(Marketplace, Vec<String>)> {
    let mut groups: Vec<(Marketplace, Vec<String>)> = Vec::new();
    for (marketplace, id) in ids {
        match groups.iter_mut().find(|(m, _)| *m == marketplace) {
            Some((_, group)) => group.push(id),
            None => groups.push((marketplace, vec![id])),
        }
    }
    groups
}

fn within_price(product: &Product, min: Option<f64>, max: Option<f64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    let Some(price) = product.price_value() else {
        return false;
    };
    min.is_none_or(|m| price >= m) && max.is_none_or(|m| price <= m)
}

fn saturating_i32<T: TryInto<i32>>(n: T) -> i32 {
    n.try_into().unwrap_or(i32::MAX)
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
