//! Market-level aggregates over a result set.

use serde::Serialize;

use crate::scoring::Scorable;

const TOP_VENDORS_CAP: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

/// Aggregate statistics over one result set. Computed per call and never
/// stored.
///
/// Price and rating figures are `0.0` when no product contributes to them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketInsights {
    pub total_products: usize,
    pub products_with_pricing: usize,
    pub average_price: f64,
    pub price_range: PriceRange,
    pub total_vendors: usize,
    /// Distinct vendors in first-seen order, capped. Not ranked by frequency.
    pub top_vendors: Vec<String>,
    pub rated_products: usize,
    pub average_rating: f64,
    pub categories: Vec<String>,
}

/// Summarizes `products`.
///
/// Non-positive prices are excluded from the price figures.
#[must_use]
pub fn compute_market_insights<P: Scorable>(products: &[P]) -> MarketInsights {
    let prices: Vec<f64> = products
        .iter()
        .filter_map(Scorable::price_value)
        .filter(|p| p.is_finite() && *p > 0.0)
        .collect();
    let ratings: Vec<f64> = products.iter().filter_map(Scorable::rating).collect();

    let mut vendors: Vec<String> = Vec::new();
    let mut categories: Vec<String> = Vec::new();
    for product in products {
        push_distinct(&mut vendors, product.vendor());
        push_distinct(&mut categories, product.category());
    }
    let total_vendors = vendors.len();
    vendors.truncate(TOP_VENDORS_CAP);

    let price_range = PriceRange {
        min: prices.iter().copied().reduce(f64::min).unwrap_or(0.0),
        max: prices.iter().copied().reduce(f64::max).unwrap_or(0.0),
    };

    MarketInsights {
        total_products: products.len(),
        products_with_pricing: prices.len(),
        average_price: round2(mean(&prices)),
        price_range,
        total_vendors,
        top_vendors: vendors,
        rated_products: ratings.len(),
        average_rating: round2(mean(&ratings)),
        categories,
    }
}

fn push_distinct(seen: &mut Vec<String>, value: Option<&str>) {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return;
    };
    if !seen.iter().any(|s| s == value) {
        seen.push(value.to_string());
    }
}

#[allow(clippy::cast_precision_loss)]
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::*;
    use crate::products::{
        AmazonDetails, CatalogProduct, Marketplace, MarketplaceDetails, Price, Product,
        ProductImage, Reviews,
    };

    fn product(vendor: &str, price: Option<f64>, rating: Option<f64>) -> Product {
        Product {
            id: format!("{vendor}-{price:?}"),
            title: "Thing".to_string(),
            vendor: Some(vendor.to_string()),
            url: "https://www.amazon.com/dp/B000000000".to_string(),
            is_available: true,
            description: None,
            images: vec![ProductImage {
                url: "https://img.example.com/a.jpg".to_string(),
            }],
            price: price.map(|v| Price::from_value(v, "USD")),
            marketplace: Marketplace::Amazon,
            category: Some("Electronics".to_string()),
            details: MarketplaceDetails::Amazon(AmazonDetails {
                asin: "B000000000".to_string(),
                reviews: Reviews {
                    rating,
                    count: None,
                },
                features: vec![],
                specifications: vec![],
            }),
        }
    }

    #[test]
    fn non_positive_prices_are_excluded() {
        let products = vec![
            product("Acme", Some(10.0), None),
            product("Acme", Some(0.0), None),
            product("Acme", Some(-5.0), None),
            product("Acme", Some(30.0), None),
            product("Acme", None, None),
        ];
        let insights = compute_market_insights(&products);
        assert_eq!(insights.total_products, 5);
        assert_eq!(insights.products_with_pricing, 2);
        assert!((insights.average_price - 20.0).abs() < f64::EPSILON);
        assert!((insights.price_range.min - 10.0).abs() < f64::EPSILON);
        assert!((insights.price_range.max - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn vendors_are_deduplicated_in_first_seen_order_and_capped() {
        let mut products = vec![product("Zeta", Some(1.0), None), product("Zeta", Some(2.0), None)];
        for i in 0..12 {
            products.push(product(&format!("Vendor{i}"), Some(5.0), None));
        }
        let insights = compute_market_insights(&products);
        assert_eq!(insights.total_vendors, 13);
        assert_eq!(insights.top_vendors.len(), 10);
        assert_eq!(insights.top_vendors[0], "Zeta");
        assert_eq!(insights.top_vendors[1], "Vendor0");
    }

    #[test]
    fn average_rating_covers_only_rated_products() {
        let products = vec![
            product("A", Some(1.0), Some(4.0)),
            product("B", Some(1.0), Some(5.0)),
            product("C", Some(1.0), None),
        ];
        let insights = compute_market_insights(&products);
        assert_eq!(insights.rated_products, 2);
        assert!((insights.average_rating - 4.5).abs() < f64::EPSILON);
        assert_eq!(insights.categories, vec!["Electronics".to_string()]);
    }

    #[test]
    fn empty_set_yields_zeroes() {
        let insights = compute_market_insights::<Product>(&[]);
        assert_eq!(insights.total_products, 0);
        assert!(insights.average_price.abs() < f64::EPSILON);
        assert!(insights.price_range.max.abs() < f64::EPSILON);
        assert!(insights.top_vendors.is_empty());
    }

    #[test]
    fn catalog_products_contribute_prices_but_no_vendors() {
        let products = vec![CatalogProduct {
            id: "A1".to_string(),
            title: "Widget".to_string(),
            url: "u1".to_string(),
            price: Some(Decimal::new(2499, 2)),
            currency_code: "USD".to_string(),
            category: Some("Tools".to_string()),
            marketplace: Marketplace::Shopify,
            is_active: true,
            updated_at: Utc::now(),
        }];
        let insights = compute_market_insights(&products);
        assert!((insights.average_price - 24.99).abs() < 1e-9);
        assert!(insights.top_vendors.is_empty());
        assert_eq!(insights.categories, vec!["Tools".to_string()]);
    }
}
