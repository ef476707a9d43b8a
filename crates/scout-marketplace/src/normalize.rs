//! Normalization from Rye wire types to [`scout_core::Product`].
//!
//! This is the only place that knows the two marketplace shapes. Every
//! product leaving it has at least one image and, when priced, a fully
//! structured [`Price`].

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use scout_core::{
    AmazonDetails, Marketplace, MarketplaceDetails, Price, Product, ProductImage, ProductOption,
    ProductVariant, Reviews, ShopifyDetails, Specification,
};

use crate::types::{AmazonProductWire, ImageWire, PriceWire, RyeProduct, ShopifyProductWire};

const PLACEHOLDER_BASE: &str = "https://placehold.co/400x400?text=";
const PLACEHOLDER_TITLE_CHARS: usize = 30;
const DEFAULT_CURRENCY: &str = "USD";

/// Converts a raw Rye product into the canonical shape.
#[must_use]
pub fn normalize_product(raw: RyeProduct) -> Product {
    match raw {
        RyeProduct::AmazonProduct(amazon) => normalize_amazon(amazon),
        RyeProduct::ShopifyProduct(shopify) => normalize_shopify(shopify),
    }
}

/// Deterministic placeholder image for a product without images.
///
/// Uses the first 30 characters of the title, percent-encoded; an empty
/// title falls back to `Product`.
#[must_use]
pub fn placeholder_image_url(title: &str) -> String {
    let trimmed = title.trim();
    let label: String = if trimmed.is_empty() {
        "Product".to_string()
    } else {
        trimmed.chars().take(PLACEHOLDER_TITLE_CHARS).collect()
    };
    format!(
        "{PLACEHOLDER_BASE}{}",
        utf8_percent_encode(&label, NON_ALPHANUMERIC)
    )
}

fn normalize_amazon(raw: AmazonProductWire) -> Product {
    let images = images_or_placeholder(raw.images, &raw.title);
    let category = raw
        .categories
        .into_iter()
        .map(|c| c.name.trim().to_string())
        .find(|name| !name.is_empty());
    let asin = non_empty(raw.asin).unwrap_or_else(|| raw.id.clone());
    let reviews = raw.reviews.unwrap_or_default();

    Product {
        id: raw.id,
        vendor: non_empty(raw.vendor),
        url: raw.url,
        is_available: raw.is_available,
        description: non_empty(raw.description),
        images,
        price: raw.price.and_then(structured_price),
        marketplace: Marketplace::Amazon,
        category,
        details: MarketplaceDetails::Amazon(AmazonDetails {
            asin,
            reviews: Reviews {
                rating: reviews
                    .rating
                    .or(raw.rating)
                    .filter(|r| r.is_finite() && *r > 0.0),
                count: reviews
                    .count
                    .or(raw.reviews_total)
                    .or(raw.ratings_total),
            },
            features: raw
                .feature_bullets
                .into_iter()
                .filter(|f| !f.trim().is_empty())
                .collect(),
            specifications: raw
                .specifications
                .into_iter()
                .map(|s| Specification {
                    name: s.name,
                    value: s.value,
                })
                .collect(),
        }),
        title: raw.title,
    }
}

fn normalize_shopify(raw: ShopifyProductWire) -> Product {
    let images = images_or_placeholder(raw.images, &raw.title);
    let price = raw.price.and_then(structured_price);
    let variant_currency = price
        .as_ref()
        .map_or_else(|| DEFAULT_CURRENCY.to_string(), |p| p.currency.clone());
    let product_type = non_empty(raw.product_type);

    let variants = raw
        .variants
        .into_iter()
        .map(|v| ProductVariant {
            id: v.id,
            title: v.title,
            price: v.price.map(|value| Price::from_value(value, &variant_currency)),
            is_available: v.is_available,
        })
        .collect();

    Product {
        id: raw.id,
        vendor: non_empty(raw.vendor),
        url: raw.url,
        is_available: raw.is_available,
        description: non_empty(raw.description),
        images,
        price,
        marketplace: Marketplace::Shopify,
        category: product_type.clone(),
        details: MarketplaceDetails::Shopify(ShopifyDetails {
            product_type,
            tags: raw.tags,
            options: raw
                .options
                .into_iter()
                .map(|o| ProductOption {
                    name: o.name,
                    values: o.values,
                })
                .collect(),
            variants,
        }),
        title: raw.title,
    }
}

fn images_or_placeholder(images: Vec<ImageWire>, title: &str) -> Vec<ProductImage> {
    let images: Vec<ProductImage> = images
        .into_iter()
        .filter(|i| !i.url.trim().is_empty())
        .map(|i| ProductImage { url: i.url })
        .collect();
    if images.is_empty() {
        vec![ProductImage {
            url: placeholder_image_url(title),
        }]
    } else {
        images
    }
}

/// Builds a structured price. A missing `value` is recovered from the
/// display string when it holds a number; a missing display string is
/// synthesized from the value.
fn structured_price(raw: PriceWire) -> Option<Price> {
    let currency = non_empty(raw.currency).unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let value = raw
        .value
        .or_else(|| raw.display_value.as_deref().and_then(parse_display_value))?;
    Some(match non_empty(raw.display_value) {
        Some(display_value) => Price {
            display_value,
            value,
            currency,
        },
        None => Price::from_value(value, &currency),
    })
}

/// Extracts the number from strings like `"$1,299.99"` or `"USD 12.50"`.
fn parse_display_value(display: &str) -> Option<f64> {
    let digits: String = display
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse::<f64>().ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
