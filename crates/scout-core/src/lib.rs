pub mod app_config;
pub mod config;
pub mod insights;
pub mod products;
pub mod scoring;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, load_scoring_policy};
pub use insights::{compute_market_insights, MarketInsights, PriceRange};
pub use products::{
    AmazonDetails, CatalogProduct, CatalogRecord, Marketplace, MarketplaceDetails, Price, Product,
    ProductImage, ProductOption, ProductVariant, Reviews, ShopifyDetails, Specification,
};
pub use scoring::{
    AffiliatePotential, DifficultyAssessment, PriceBand, Scorable, ScoreWeights, ScoredProduct,
    ScoringBreakdown, ScoringEngine, ScoringPolicy, TierThresholds,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read scoring policy file {path}: {source}")]
    PolicyFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse scoring policy: {0}")]
    PolicyFileParse(#[source] serde_yaml::Error),

    #[error("invalid scoring policy: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid marketplace: {0}")]
    InvalidMarketplace(String),
}
