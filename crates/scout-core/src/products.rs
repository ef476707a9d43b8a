//! Canonical product shapes shared by the catalog, the marketplace client,
//! and the scoring engine.
//!
//! Two families live here:
//!
//! - [`CatalogProduct`] / [`CatalogRecord`]: rows of the local catalog table
//!   (read side and write side respectively).
//! - [`Product`]: a product fetched from the remote marketplace and already
//!   normalized. Marketplace-specific fields sit behind
//!   [`MarketplaceDetails`]; nothing upstream of the normalizer ever sees the
//!   raw wire shapes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Marketplace a product belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Shopify,
    Amazon,
    Other,
}

impl Marketplace {
    /// Lowercase storage form, as written to `catalog_products.marketplace`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Marketplace::Shopify => "shopify",
            Marketplace::Amazon => "amazon",
            Marketplace::Other => "other",
        }
    }

    /// Uppercase enum value used by the Rye GraphQL schema.
    ///
    /// Rye only knows `AMAZON` and `SHOPIFY`; [`Marketplace::Other`] is sent
    /// as `SHOPIFY` because every non-Amazon storefront Rye indexes is one.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Marketplace::Amazon => "AMAZON",
            Marketplace::Shopify | Marketplace::Other => "SHOPIFY",
        }
    }

    /// Lenient parse used by the CSV importer: blank means Shopify (the
    /// table default), anything unrecognized means [`Marketplace::Other`].
    #[must_use]
    pub fn from_import_field(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Marketplace::Shopify;
        }
        trimmed.parse().unwrap_or(Marketplace::Other)
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shopify" => Ok(Marketplace::Shopify),
            "amazon" => Ok(Marketplace::Amazon),
            "other" => Ok(Marketplace::Other),
            _ => Err(CoreError::InvalidMarketplace(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A locally cached marketplace product, as stored in `catalog_products`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    /// Marketplace-native identifier (ASIN, Shopify product id, ...).
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: Option<Decimal>,
    /// ISO 4217 code; `"USD"` when the source left it blank.
    pub currency_code: String,
    pub category: Option<String>,
    pub marketplace: Marketplace,
    pub is_active: bool,
    pub updated_at: DateTime<Utc>,
}

/// Write-side shape of a catalog row. The store fills in `is_active` and
/// `updated_at` itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    pub url: String,
    pub price: Option<Decimal>,
    pub currency_code: String,
    pub category: Option<String>,
    pub marketplace: Marketplace,
}

// ---------------------------------------------------------------------------
// Remote products
// ---------------------------------------------------------------------------

/// Structured price. `value` is in major currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub display_value: String,
    pub value: f64,
    pub currency: String,
}

impl Price {
    /// Builds a price from a bare value, synthesizing `"<CUR> <value>"` as
    /// the display string.
    #[must_use]
    pub fn from_value(value: f64, currency: &str) -> Self {
        Self {
            display_value: format!("{currency} {value:.2}"),
            value,
            currency: currency.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub url: String,
}

/// A product fetched from the remote marketplace, in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub title: String,
    pub vendor: Option<String>,
    pub url: String,
    pub is_available: bool,
    pub description: Option<String>,
    /// Never empty: the normalizer synthesizes a placeholder when the
    /// marketplace returned no image.
    pub images: Vec<ProductImage>,
    pub price: Option<Price>,
    pub marketplace: Marketplace,
    pub category: Option<String>,
    pub details: MarketplaceDetails,
}

/// Marketplace-specific payload of a [`Product`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MarketplaceDetails {
    Amazon(AmazonDetails),
    Shopify(ShopifyDetails),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmazonDetails {
    pub asin: String,
    pub reviews: Reviews,
    pub features: Vec<String>,
    pub specifications: Vec<Specification>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reviews {
    /// Average star rating on a 0–5 scale.
    pub rating: Option<f64>,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specification {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopifyDetails {
    pub product_type: Option<String>,
    pub tags: Vec<String>,
    pub options: Vec<ProductOption>,
    pub variants: Vec<ProductVariant>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: String,
    pub title: String,
    pub price: Option<Price>,
    pub is_available: bool,
}

impl Product {
    /// Star rating, when the marketplace reports one.
    #[must_use]
    pub fn rating(&self) -> Option<f64> {
        match &self.details {
            MarketplaceDetails::Amazon(amazon) => amazon.reviews.rating,
            MarketplaceDetails::Shopify(_) => None,
        }
    }

    /// Bullet-point feature list (Amazon only).
    #[must_use]
    pub fn features(&self) -> &[String] {
        match &self.details {
            MarketplaceDetails::Amazon(amazon) => &amazon.features,
            MarketplaceDetails::Shopify(_) => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marketplace_parses_case_insensitively() {
        assert_eq!("AMAZON".parse::<Marketplace>().unwrap(), Marketplace::Amazon);
        assert_eq!(" Shopify ".parse::<Marketplace>().unwrap(), Marketplace::Shopify);
        assert!("ebay".parse::<Marketplace>().is_err());
    }

    #[test]
    fn import_field_defaults_blank_to_shopify_and_unknown_to_other() {
        assert_eq!(Marketplace::from_import_field(""), Marketplace::Shopify);
        assert_eq!(Marketplace::from_import_field("amazon"), Marketplace::Amazon);
        assert_eq!(Marketplace::from_import_field("etsy"), Marketplace::Other);
    }

    #[test]
    fn wire_name_maps_other_to_shopify() {
        assert_eq!(Marketplace::Amazon.wire_name(), "AMAZON");
        assert_eq!(Marketplace::Other.wire_name(), "SHOPIFY");
    }

    #[test]
    fn price_from_value_synthesizes_display_value() {
        let price = Price::from_value(19.5, "USD");
        assert_eq!(price.display_value, "USD 19.50");
        assert_eq!(price.currency, "USD");
    }

    #[test]
    fn marketplace_serializes_lowercase() {
        let json = serde_json::to_string(&Marketplace::Amazon).unwrap();
        assert_eq!(json, "\"amazon\"");
    }
}
