//! The seam between callers and the remote marketplace.
//!
//! [`MarketplaceApi`] is implemented by [`crate::RyeClient`] and by test
//! fakes. Batch fetch and fetch-by-URL are provided methods built on the
//! three primitive calls, so every implementation gets the same settle-all
//! and index-wait behavior.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use scout_core::{Marketplace, Product};

use crate::error::MarketplaceError;
use crate::retry::backoff_delay;

/// Hard ceiling on identifiers per logical batch imposed by the marketplace.
pub const MAX_BATCH_SIZE: usize = 25;

/// Result of an indexing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRequest {
    pub product_id: String,
    pub marketplace: Marketplace,
}

/// Settle-all outcome of a batch fetch. Each error reads `"<id>: <reason>"`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchFetch {
    pub products: Vec<Product>,
    pub errors: Vec<String>,
}

/// Bounded polling policy used while a freshly requested product is
/// being indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexWait {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub timeout: Duration,
}

impl Default for IndexWait {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            timeout: Duration::from_secs(20),
        }
    }
}

#[async_trait]
pub trait MarketplaceApi: Send + Sync {
    /// Asks the marketplace to index `url`. The returned id may not be
    /// resolvable yet.
    async fn request_by_url(&self, url: &str) -> Result<UrlRequest, MarketplaceError>;

    /// Fetches one product. Unknown or not-yet-indexed ids are
    /// [`MarketplaceError::NotFound`].
    async fn get_by_id(&self, id: &str, marketplace: Marketplace)
        -> Result<Product, MarketplaceError>;

    /// Keyword query against the remote index.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, MarketplaceError>;

    fn index_wait(&self) -> IndexWait {
        IndexWait::default()
    }

    /// Fetches every id concurrently. Individual failures are collected,
    /// never propagated; only an oversized batch is an error.
    async fn get_by_ids(
        &self,
        ids: &[String],
        marketplace: Marketplace,
    ) -> Result<BatchFetch, MarketplaceError> {
        if ids.len() > MAX_BATCH_SIZE {
            return Err(MarketplaceError::BatchTooLarge {
                requested: ids.len(),
                max: MAX_BATCH_SIZE,
            });
        }

        let outcomes = join_all(ids.iter().map(|id| async move {
            (id, self.get_by_id(id, marketplace).await)
        }))
        .await;

        let mut batch = BatchFetch::default();
        for (id, outcome) in outcomes {
            match outcome {
                Ok(product) => batch.products.push(product),
                Err(err) => {
                    tracing::warn!(id = %id, error = %err, "product fetch failed");
                    batch.errors.push(format!("{id}: {err}"));
                }
            }
        }
        Ok(batch)
    }

    /// Requests indexing of `url`, then polls [`MarketplaceApi::get_by_id`]
    /// with exponential back-off while the product is not found yet.
    ///
    /// Gives up with [`MarketplaceError::IndexingTimedOut`] once the attempts
    /// or the overall deadline from [`MarketplaceApi::index_wait`] run out.
    async fn get_by_url(&self, url: &str) -> Result<Product, MarketplaceError> {
        let request = self.request_by_url(url).await?;
        wait_for_indexing(self, &request, self.index_wait()).await
    }
}

async fn wait_for_indexing<A>(
    api: &A,
    request: &UrlRequest,
    wait: IndexWait,
) -> Result<Product, MarketplaceError>
where
    A: MarketplaceApi + ?Sized,
{
    let timed_out = || MarketplaceError::IndexingTimedOut {
        product_id: request.product_id.clone(),
        waited_ms: u64::try_from(wait.timeout.as_millis()).unwrap_or(u64::MAX),
    };

    let poll = async {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match api.get_by_id(&request.product_id, request.marketplace).await {
                Err(MarketplaceError::NotFound { .. }) if attempt < wait.max_attempts => {
                    let delay = backoff_delay(wait.base_delay_ms, attempt);
                    tracing::debug!(
                        product_id = %request.product_id,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "product not indexed yet"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(MarketplaceError::NotFound { .. }) => return Err(timed_out()),
                other => return other,
            }
        }
    };

    tokio::time::timeout(wait.timeout, poll)
        .await
        .map_err(|_| timed_out())?
}

/// Marketplace that serves `url`: Amazon for `amazon.*`/`amzn.*` hosts,
/// Shopify otherwise.
///
/// # Errors
///
/// Returns [`MarketplaceError::InvalidUrl`] if `url` is not an absolute
/// http(s) URL with a host.
pub fn marketplace_for_url(url: &str) -> Result<Marketplace, MarketplaceError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| MarketplaceError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(MarketplaceError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| MarketplaceError::InvalidUrl {
            url: url.to_string(),
            reason: "missing host".to_string(),
        })?
        .to_ascii_lowercase();

    let is_amazon = host
        .split('.')
        .any(|label| label == "amazon" || label == "amzn");
    Ok(if is_amazon {
        Marketplace::Amazon
    } else {
        Marketplace::Shopify
    })
}
