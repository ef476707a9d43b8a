use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use scout_core::{Marketplace, Product};
use scout_marketplace::{BatchFetch, IndexWait, MarketplaceApi, MarketplaceError, UrlRequest};

/// Counts every remote call issued through it. A batch fetch counts one
/// call per identifier.
pub(crate) struct MeteredApi<'a> {
    inner: &'a dyn MarketplaceApi,
    calls: AtomicU32,
}

impl<'a> MeteredApi<'a> {
    pub(crate) fn new(inner: &'a dyn MarketplaceApi) -> Self {
        Self {
            inner,
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::Relaxed)
    }

    fn record(&self, n: usize) {
        let n = u32::try_from(n).unwrap_or(u32::MAX);
        self.calls.fetch_add(n, Ordering::Relaxed);
    }
}

#[async_trait]
impl MarketplaceApi for MeteredApi<'_> {
    async fn request_by_url(&self, url: &str) -> Result<UrlRequest, MarketplaceError> {
        self.record(1);
        self.inner.request_by_url(url).await
    }

    async fn get_by_id(
        &self,
        id: &str,
        marketplace: Marketplace,
    ) -> Result<Product, MarketplaceError> {
        self.record(1);
        self.inner.get_by_id(id, marketplace).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, MarketplaceError> {
        self.record(1);
        self.inner.search(query, limit).await
    }

    fn index_wait(&self) -> IndexWait {
        self.inner.index_wait()
    }

    async fn get_by_ids(
        &self,
        ids: &[String],
        marketplace: Marketplace,
    ) -> Result<BatchFetch, MarketplaceError> {
        if ids.len() <= scout_marketplace::MAX_BATCH_SIZE {
            self.record(ids.len());
        }
        self.inner.get_by_ids(ids, marketplace).await
    }
}
