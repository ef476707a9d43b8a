use scout_core::Scorable;
use serde_json::json;

use super::*;

fn wire(value: serde_json::Value) -> RyeProduct {
    serde_json::from_value(value).expect("valid RyeProduct fixture")
}

#[test]
fn amazon_product_maps_onto_canonical_shape() {
    let product = normalize_product(wire(json!({
        "__typename": "AmazonProduct",
        "id": "B08N5WRWNW",
        "title": "Noise Cancelling Headphones",
        "vendor": "Sony",
        "url": "https://www.amazon.com/dp/B08N5WRWNW",
        "isAvailable": true,
        "description": "Wireless.",
        "images": [{ "url": "https://img.example.com/1.jpg" }],
        "price": { "displayValue": "$278.00", "value": 278.0, "currency": "USD" },
        "ASIN": "B08N5WRWNW",
        "categories": [{ "name": "Electronics" }, { "name": "Headphones" }],
        "featureBullets": ["30-hour battery", " "],
        "specifications": [{ "name": "Weight", "value": "254 g" }],
        "rating": 4.6,
        "ratingsTotal": 51000,
        "reviewsTotal": 12000
    })));

    assert_eq!(product.marketplace, Marketplace::Amazon);
    assert_eq!(product.category.as_deref(), Some("Electronics"));
    assert_eq!(product.vendor.as_deref(), Some("Sony"));
    assert_eq!(product.price.as_ref().map(|p| p.value), Some(278.0));
    let MarketplaceDetails::Amazon(details) = &product.details else {
        panic!("expected Amazon details, got {:?}", product.details);
    };
    assert_eq!(details.asin, "B08N5WRWNW");
    assert_eq!(details.reviews.rating, Some(4.6));
    assert_eq!(details.reviews.count, Some(12000));
    assert_eq!(details.features, vec!["30-hour battery".to_string()]);
    assert_eq!(details.specifications.len(), 1);
}

#[test]
fn nested_reviews_take_precedence_over_flat_totals() {
    let product = normalize_product(wire(json!({
        "__typename": "AmazonProduct",
        "id": "B07XJ8C8F5",
        "title": "Smart Speaker",
        "images": [{ "url": "https://img.example.com/2.jpg" }],
        "reviews": { "rating": 4.5, "count": 10 },
        "ratingsTotal": 900
    })));

    let MarketplaceDetails::Amazon(details) = &product.details else {
        panic!("expected Amazon details, got {:?}", product.details);
    };
    assert_eq!(details.reviews.rating, Some(4.5));
    assert_eq!(details.reviews.count, Some(10));
    assert_eq!(product.rating(), Some(4.5));
}

#[test]
fn zero_rating_counts_as_unrated() {
    let product = normalize_product(wire(json!({
        "__typename": "AmazonProduct",
        "id": "B07XJ8C8F5",
        "title": "Smart Speaker",
        "reviews": { "rating": 0.0, "count": 0 }
    })));

    assert_eq!(product.rating(), None);
}

#[test]
fn missing_images_get_a_placeholder() {
    let product = normalize_product(wire(json!({
        "__typename": "AmazonProduct",
        "id": "B000000001",
        "title": "Widget & Gadget",
        "images": []
    })));

    assert_eq!(product.images.len(), 1);
    assert_eq!(
        product.images[0].url,
        "https://placehold.co/400x400?text=Widget%20%26%20Gadget"
    );
}

#[test]
fn placeholder_uses_first_thirty_characters() {
    let title = "An extremely long product title that keeps going";
    let url = placeholder_image_url(title);
    let encoded_prefix = utf8_percent_encode(
        "An extremely long product titl",
        NON_ALPHANUMERIC,
    )
    .to_string();
    assert_eq!(url, format!("https://placehold.co/400x400?text={encoded_prefix}"));
}

#[test]
fn placeholder_for_blank_title_uses_product() {
    assert_eq!(
        placeholder_image_url("   "),
        "https://placehold.co/400x400?text=Product"
    );
}

#[test]
fn shopify_variant_prices_become_structured() {
    let product = normalize_product(wire(json!({
        "__typename": "ShopifyProduct",
        "id": "7001",
        "title": "Linen Shirt",
        "vendor": "",
        "url": "https://shop.example.com/products/linen-shirt",
        "isAvailable": true,
        "price": { "displayValue": "€45.00", "value": 45.0, "currency": "EUR" },
        "productType": "Apparel",
        "tags": ["summer"],
        "options": [{ "name": "Size", "values": ["S", "M"] }],
        "variants": [
            { "id": "v1", "title": "S", "price": "45.00", "isAvailable": true },
            { "id": "v2", "title": "M", "price": 47, "isAvailable": false }
        ]
    })));

    assert_eq!(product.marketplace, Marketplace::Shopify);
    assert_eq!(product.category.as_deref(), Some("Apparel"));
    assert!(product.vendor.is_none());
    let MarketplaceDetails::Shopify(details) = &product.details else {
        panic!("expected Shopify details, got {:?}", product.details);
    };
    let first = details.variants[0].price.as_ref().unwrap();
    assert_eq!(first.display_value, "EUR 45.00");
    assert!((first.value - 45.0).abs() < f64::EPSILON);
    assert_eq!(first.currency, "EUR");
    assert_eq!(
        details.variants[1].price.as_ref().unwrap().display_value,
        "EUR 47.00"
    );
    assert_eq!(details.options[0].values, vec!["S", "M"]);
}

#[test]
fn shopify_variant_currency_defaults_to_usd() {
    let product = normalize_product(wire(json!({
        "__typename": "ShopifyProduct",
        "id": "7002",
        "title": "Mug",
        "productType": "",
        "variants": [{ "id": "v1", "title": "Default", "price": "9.5" }]
    })));

    assert!(product.price.is_none());
    assert!(product.category.is_none());
    let MarketplaceDetails::Shopify(details) = &product.details else {
        panic!("expected Shopify details");
    };
    assert_eq!(
        details.variants[0].price.as_ref().unwrap().display_value,
        "USD 9.50"
    );
}

#[test]
fn price_value_is_recovered_from_display_string() {
    let product = normalize_product(wire(json!({
        "__typename": "AmazonProduct",
        "id": "B000000002",
        "title": "Lamp",
        "price": { "displayValue": "$1,299.99" }
    })));

    let price = product.price.unwrap();
    assert!((price.value - 1299.99).abs() < 1e-9);
    assert_eq!(price.display_value, "$1,299.99");
    assert_eq!(price.currency, "USD");
}
