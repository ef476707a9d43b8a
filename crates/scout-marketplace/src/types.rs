//! Rye GraphQL wire types.
//!
//! These shapes never leave the crate: [`crate::normalize`] converts every
//! [`RyeProduct`] into a canonical [`scout_core::Product`].
//!
//! Every query aliases its root field (`product`, `result`, `search`,
//! `schema`) so the data envelopes below do not depend on the operation name.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct GraphqlRequest<'a> {
    pub query: &'static str,
    pub variables: &'a serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlError {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductByIdData {
    pub product: Option<RyeProduct>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RequestByUrlData {
    pub result: Option<RequestByUrlPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RequestByUrlPayload {
    pub product_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductSearchData {
    pub search: Option<ProductSearchPayload>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProductSearchPayload {
    #[serde(default)]
    pub products: Vec<RyeProduct>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaCheckData {
    pub schema: Option<SchemaType>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SchemaType {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// A product as returned by `productByID`, discriminated by `__typename`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "__typename")]
pub enum RyeProduct {
    AmazonProduct(AmazonProductWire),
    ShopifyProduct(ShopifyProductWire),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmazonProductWire {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageWire>,
    #[serde(default)]
    pub price: Option<PriceWire>,
    #[serde(default, rename = "ASIN")]
    pub asin: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<CategoryWire>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub feature_bullets: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub specifications: Vec<SpecificationWire>,
    #[serde(default)]
    pub reviews: Option<ReviewsWire>,
    /// Flat star rating some index responses carry instead of `reviews`.
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub ratings_total: Option<u64>,
    #[serde(default)]
    pub reviews_total: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopifyProductWire {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub is_available: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub images: Vec<ImageWire>,
    #[serde(default)]
    pub price: Option<PriceWire>,
    #[serde(default)]
    pub product_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<OptionWire>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub variants: Vec<VariantWire>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewsWire {
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImageWire {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceWire {
    #[serde(default)]
    pub display_value: Option<String>,
    #[serde(default, deserialize_with = "bare_number")]
    pub value: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryWire {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpecificationWire {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptionWire {
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

/// Shopify variant. `price` arrives as a bare number or numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantWire {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "bare_number")]
    pub price: Option<f64>,
    #[serde(default)]
    pub is_available: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts `12.5`, `"12.50"`, `null`, or an unparseable string (as `None`).
fn bare_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => Some(n),
        Some(Raw::Text(s)) => s.trim().parse::<f64>().ok(),
        None => None,
    })
}

// ---------------------------------------------------------------------------
// Documents
// ---------------------------------------------------------------------------

macro_rules! product_fields {
    () => {
        r"
fragment ProductFields on Product {
  __typename
  id
  title
  vendor
  url
  isAvailable
  description
  images { url }
  price { displayValue value currency }
  ... on AmazonProduct {
    ASIN
    categories { name url }
    featureBullets
    specifications { name value }
    reviews { rating count }
    ratingsTotal
    reviewsTotal
  }
  ... on ShopifyProduct {
    productType
    tags
    options { name values }
    variants {
      id
      title
      ... on ShopifyVariant { price isAvailable }
    }
  }
}
"
    };
}

pub(crate) const PRODUCT_BY_ID: &str = concat!(
    r"
query ProductByID($input: ProductByIDInput!) {
  product: productByID(input: $input) { ...ProductFields }
}
",
    product_fields!()
);

pub(crate) const PRODUCT_SEARCH: &str = concat!(
    r"
query ProductSearch($input: ProductSearchInput!) {
  search: productSearch(input: $input) { products { ...ProductFields } }
}
",
    product_fields!()
);

pub(crate) const REQUEST_AMAZON_BY_URL: &str = r"
mutation RequestAmazonProductByURL($input: RequestAmazonProductByURLInput!) {
  result: requestAmazonProductByURL(input: $input) { productId }
}
";

pub(crate) const REQUEST_SHOPIFY_BY_URL: &str = r"
mutation RequestShopifyProductByURL($input: RequestShopifyProductByURLInput!) {
  result: requestShopifyProductByURL(input: $input) { productId }
}
";

pub(crate) const SCHEMA_CHECK: &str = r#"
query SchemaCheck {
  schema: __type(name: "Product") { name }
}
"#;
