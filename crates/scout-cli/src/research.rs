//! `search`, `research` and `marketplace` command handlers.

use std::sync::Arc;

use anyhow::Context;
use scout_core::{AppConfig, ScoringEngine};
use scout_marketplace::{MarketplaceApi, RyeClient};
use scout_research::{ResearchInput, ResearchRequest, Researcher, SearchStrategy};
use sqlx::PgPool;

use crate::output::print_json;

fn build_researcher(pool: PgPool, config: &AppConfig) -> anyhow::Result<Researcher> {
    let client =
        RyeClient::from_app_config(config).context("marketplace client is not configured")?;
    let api: Arc<dyn MarketplaceApi> = Arc::new(client);
    let policy = scout_core::load_scoring_policy(config)?;

    Ok(Researcher::new(
        Arc::clone(&api),
        SearchStrategy::hybrid(pool.clone(), api),
        ScoringEngine::new(policy),
    )
    .with_log(Arc::new(pool)))
}

/// Treats anything that looks like a URL as a URL, everything else as an ASIN.
pub(crate) fn parse_input(raw: &str) -> ResearchInput {
    let raw = raw.trim();
    if raw.starts_with("http://") || raw.starts_with("https://") {
        ResearchInput {
            url: Some(raw.to_string()),
            asin: None,
        }
    } else {
        ResearchInput {
            url: None,
            asin: Some(raw.to_ascii_uppercase()),
        }
    }
}

pub(crate) fn build_request(
    niche: Option<String>,
    max_results: Option<usize>,
    min_price: Option<f64>,
    max_price: Option<f64>,
    inputs: &[String],
) -> ResearchRequest {
    ResearchRequest {
        niche,
        inputs: inputs.iter().map(|raw| parse_input(raw)).collect(),
        max_results,
        min_price,
        max_price,
    }
}

pub(crate) async fn run_search(
    pool: PgPool,
    config: &AppConfig,
    query: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let researcher = build_researcher(pool, config)?;
    let response = researcher.search_unified(query, limit).await;
    print_json(&response)
}

pub(crate) async fn run_research(
    pool: PgPool,
    config: &AppConfig,
    request: &ResearchRequest,
) -> anyhow::Result<()> {
    let researcher = build_researcher(pool, config)?;
    let report = researcher.research_products(request).await?;
    if !report.errors.is_empty() {
        tracing::warn!(count = report.errors.len(), "research finished with partial failures");
    }
    print_json(&report)
}

pub(crate) async fn run_marketplace_ping(config: &AppConfig) -> anyhow::Result<()> {
    let client = RyeClient::from_app_config(config)?;
    client.ping().await?;
    println!("marketplace ok");
    Ok(())
}
