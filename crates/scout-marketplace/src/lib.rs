//! Remote marketplace access: the Rye GraphQL client, normalization of its
//! Amazon and Shopify product shapes, and the [`MarketplaceApi`] seam the
//! research pipeline depends on.

pub mod api;
pub mod client;
pub mod error;
pub mod normalize;
pub(crate) mod retry;
pub mod types;

pub use api::{marketplace_for_url, BatchFetch, IndexWait, MarketplaceApi, UrlRequest, MAX_BATCH_SIZE};
pub use client::{RyeClient, RyeClientConfig, DEFAULT_ENDPOINT};
pub use error::MarketplaceError;
pub use normalize::{normalize_product, placeholder_image_url};
pub use types::RyeProduct;
