//! HTTP client for the Rye GraphQL API.
//!
//! Every request carries the static API key as `Authorization: Basic <key>`
//! and the caller IP as `Rye-Shopper-IP`; Rye rejects calls missing either.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::json;

use scout_core::{AppConfig, Marketplace, Product};

use crate::api::{marketplace_for_url, IndexWait, MarketplaceApi, UrlRequest};
use crate::error::MarketplaceError;
use crate::normalize::normalize_product;
use crate::retry::retry_with_backoff;
use crate::types::{
    GraphqlRequest, GraphqlResponse, ProductByIdData, ProductSearchData, RequestByUrlData,
    SchemaCheckData, PRODUCT_BY_ID, PRODUCT_SEARCH, REQUEST_AMAZON_BY_URL,
    REQUEST_SHOPIFY_BY_URL, SCHEMA_CHECK,
};

pub const DEFAULT_ENDPOINT: &str = "https://graphql.api.rye.com/v1/query";

const SHOPPER_IP_HEADER: &str = "Rye-Shopper-IP";

/// Everything needed to build a [`RyeClient`].
#[derive(Clone)]
pub struct RyeClientConfig {
    pub endpoint: String,
    pub api_key: String,
    pub shopper_ip: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub index_wait: IndexWait,
}

impl std::fmt::Debug for RyeClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RyeClientConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[redacted]")
            .field("shopper_ip", &self.shopper_ip)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("index_wait", &self.index_wait)
            .finish()
    }
}

impl RyeClientConfig {
    /// Production defaults with the given credentials.
    #[must_use]
    pub fn new(api_key: &str, shopper_ip: &str) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.to_string(),
            shopper_ip: shopper_ip.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 500,
            index_wait: IndexWait::default(),
        }
    }

    /// # Errors
    ///
    /// Returns [`MarketplaceError::MissingCredential`] if `RYE_API_KEY` or
    /// `RYE_SHOPPER_IP` is not configured.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, MarketplaceError> {
        let api_key = config
            .rye_api_key
            .clone()
            .ok_or(MarketplaceError::MissingCredential("RYE_API_KEY"))?;
        let shopper_ip = config
            .rye_shopper_ip
            .clone()
            .ok_or(MarketplaceError::MissingCredential("RYE_SHOPPER_IP"))?;
        Ok(Self {
            endpoint: config.rye_endpoint.clone(),
            api_key,
            shopper_ip,
            timeout_secs: config.remote_timeout_secs,
            max_retries: config.remote_max_retries,
            backoff_base_ms: config.remote_backoff_base_ms,
            index_wait: IndexWait {
                max_attempts: config.index_wait_attempts.max(1),
                base_delay_ms: config.index_wait_base_ms,
                timeout: Duration::from_secs(config.index_wait_timeout_secs),
            },
        })
    }
}

/// Client for the Rye GraphQL API.
///
/// Constructed explicitly from a [`RyeClientConfig`]; point `endpoint` at a
/// mock server in tests.
pub struct RyeClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    shopper_ip: String,
    max_retries: u32,
    backoff_base_ms: u64,
    index_wait: IndexWait,
}

impl RyeClient {
    /// # Errors
    ///
    /// - [`MarketplaceError::MissingCredential`] if the API key or shopper IP
    ///   is blank.
    /// - [`MarketplaceError::InvalidUrl`] if `endpoint` does not parse.
    /// - [`MarketplaceError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(config: RyeClientConfig) -> Result<Self, MarketplaceError> {
        if config.api_key.trim().is_empty() {
            return Err(MarketplaceError::MissingCredential("RYE_API_KEY"));
        }
        if config.shopper_ip.trim().is_empty() {
            return Err(MarketplaceError::MissingCredential("RYE_SHOPPER_IP"));
        }

        let endpoint = Url::parse(&config.endpoint).map_err(|e| MarketplaceError::InvalidUrl {
            url: config.endpoint.clone(),
            reason: e.to_string(),
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("scout/0.1 (product-research)")
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: config.api_key,
            shopper_ip: config.shopper_ip,
            max_retries: config.max_retries,
            backoff_base_ms: config.backoff_base_ms,
            index_wait: config.index_wait,
        })
    }

    /// # Errors
    ///
    /// See [`RyeClientConfig::from_app_config`] and [`RyeClient::new`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, MarketplaceError> {
        Self::new(RyeClientConfig::from_app_config(config)?)
    }

    /// Schema introspection check. Confirms the endpoint is reachable and
    /// accepts the configured credentials.
    ///
    /// # Errors
    ///
    /// Any transport, status, or GraphQL error from the check.
    pub async fn ping(&self) -> Result<(), MarketplaceError> {
        let data: SchemaCheckData = self
            .execute("SchemaCheck", SCHEMA_CHECK, &json!({}))
            .await?;
        match data.schema {
            Some(schema) => {
                tracing::debug!(type_name = %schema.name, "marketplace schema check succeeded");
                Ok(())
            }
            None => Err(MarketplaceError::Graphql {
                operation: "SchemaCheck".to_string(),
                message: "Product type missing from schema".to_string(),
            }),
        }
    }

    /// Posts one GraphQL document, retrying transient failures.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &'static str,
        variables: &serde_json::Value,
    ) -> Result<T, MarketplaceError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self
                .client
                .post(self.endpoint.clone())
                .header(AUTHORIZATION, format!("Basic {}", self.api_key))
                .header(SHOPPER_IP_HEADER, &self.shopper_ip)
                .json(&GraphqlRequest { query, variables })
                .send()
                .await
                .map_err(|e| MarketplaceError::from_transport(e, operation))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok());
                return Err(MarketplaceError::RateLimited { retry_after_secs });
            }
            if !status.is_success() {
                return Err(MarketplaceError::UnexpectedStatus {
                    status: status.as_u16(),
                    operation: operation.to_string(),
                });
            }

            let body = response
                .text()
                .await
                .map_err(|e| MarketplaceError::from_transport(e, operation))?;
            let envelope: GraphqlResponse<T> =
                serde_json::from_str(&body).map_err(|e| MarketplaceError::Deserialize {
                    context: operation.to_string(),
                    source: e,
                })?;

            if !envelope.errors.is_empty() {
                let message = envelope
                    .errors
                    .iter()
                    .map(|e| e.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; ");
                let lowered = message.to_ascii_lowercase();
                if lowered.contains("rate limit") || lowered.contains("too many requests") {
                    return Err(MarketplaceError::RateLimited {
                        retry_after_secs: None,
                    });
                }
                return Err(MarketplaceError::Graphql {
                    operation: operation.to_string(),
                    message,
                });
            }

            envelope.data.ok_or_else(|| MarketplaceError::Graphql {
                operation: operation.to_string(),
                message: "response carried neither data nor errors".to_string(),
            })
        })
        .await
    }
}

#[async_trait]
impl MarketplaceApi for RyeClient {
    async fn request_by_url(&self, url: &str) -> Result<UrlRequest, MarketplaceError> {
        let marketplace = marketplace_for_url(url)?;
        let (operation, document) = match marketplace {
            Marketplace::Amazon => ("requestAmazonProductByURL", REQUEST_AMAZON_BY_URL),
            Marketplace::Shopify | Marketplace::Other => {
                ("requestShopifyProductByURL", REQUEST_SHOPIFY_BY_URL)
            }
        };

        let data: RequestByUrlData = self
            .execute(operation, document, &json!({ "input": { "url": url } }))
            .await?;
        let product_id = data
            .result
            .and_then(|r| r.product_id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| MarketplaceError::Graphql {
                operation: operation.to_string(),
                message: format!("no productId returned for {url}"),
            })?;

        tracing::info!(%url, %product_id, marketplace = %marketplace, "requested product indexing");
        Ok(UrlRequest {
            product_id,
            marketplace,
        })
    }

    async fn get_by_id(
        &self,
        id: &str,
        marketplace: Marketplace,
    ) -> Result<Product, MarketplaceError> {
        let variables = json!({ "input": { "id": id, "marketplace": marketplace.wire_name() } });
        let data: ProductByIdData = match self.execute("productByID", PRODUCT_BY_ID, &variables).await
        {
            Err(MarketplaceError::Graphql { message, .. })
                if message.to_ascii_lowercase().contains("not found") =>
            {
                return Err(MarketplaceError::NotFound { id: id.to_string() });
            }
            other => other?,
        };

        data.product
            .map(normalize_product)
            .ok_or_else(|| MarketplaceError::NotFound { id: id.to_string() })
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Product>, MarketplaceError> {
        let variables = json!({ "input": { "query": query, "limit": limit } });
        let data: ProductSearchData = self
            .execute("productSearch", PRODUCT_SEARCH, &variables)
            .await?;

        let products: Vec<Product> = data
            .search
            .map(|s| s.products)
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(normalize_product)
            .collect();
        tracing::debug!(%query, results = products.len(), "remote search completed");
        Ok(products)
    }

    fn index_wait(&self) -> IndexWait {
        self.index_wait
    }
}
