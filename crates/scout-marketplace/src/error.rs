use std::time::Duration;

use thiserror::Error;

/// Errors returned by the remote marketplace client.
#[derive(Debug, Error)]
pub enum MarketplaceError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The per-call deadline elapsed before the marketplace answered.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// HTTP 429, or a GraphQL error reporting a rate limit.
    #[error("rate limited by marketplace API")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("unexpected HTTP status {status} from {operation}")]
    UnexpectedStatus { status: u16, operation: String },

    /// The GraphQL response carried an `errors` array.
    #[error("GraphQL error from {operation}: {message}")]
    Graphql { operation: String, message: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The product does not exist, or has not been indexed yet.
    #[error("product {id} not found")]
    NotFound { id: String },

    #[error("batch of {requested} identifiers exceeds the limit of {max}")]
    BatchTooLarge { requested: usize, max: usize },

    #[error("missing marketplace credential: {0}")]
    MissingCredential(&'static str),

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("product {product_id} was not indexed within {waited_ms}ms")]
    IndexingTimedOut { product_id: String, waited_ms: u64 },
}

impl MarketplaceError {
    /// Server-requested wait before the next attempt, from `Retry-After`.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited {
                retry_after_secs: Some(secs),
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Converts a transport failure, keeping timeouts distinct.
    pub(crate) fn from_transport(err: reqwest::Error, operation: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                operation: operation.to_string(),
            }
        } else {
            Self::Http(err)
        }
    }
}
