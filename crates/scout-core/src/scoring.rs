//! Affiliate-worthiness scoring.
//!
//! Every product is scored on seven independent sub-scores whose bounds are
//! fixed by the [`ScoringPolicy`]. The sum is the `affiliate_score`; two tier
//! labels are derived from it using the policy thresholds.

use std::path::Path;

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::products::{CatalogProduct, Marketplace, Product};
use crate::ConfigError;

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Tunable scoring policy: tier thresholds, curated lists, and every
/// sub-score weight.
///
/// All fields default to the built-in policy, so a YAML file only needs to
/// name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub thresholds: TierThresholds,
    /// Vendors that earn the market bonus (case-insensitive containment).
    pub recognized_vendors: Vec<String>,
    /// Vendors that earn the brand bonus (case-insensitive containment).
    pub premium_brands: Vec<String>,
    /// Category/title keywords associated with higher commission rates.
    pub high_commission_keywords: Vec<String>,
    /// Marketplace known for higher conversion.
    pub preferred_marketplace: Marketplace,
    pub weights: ScoreWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierThresholds {
    /// Score at or above which a product is "Low Competition" / "High".
    pub high: f64,
    /// Score at or above which a product is "Medium Difficulty" / "Good".
    pub good: f64,
}

/// Upper bound of a price band and the price sub-score it earns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub max_price: f64,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub available: f64,
    pub unavailable: f64,
    /// Ascending by `max_price`, descending by `score`.
    pub price_bands: Vec<PriceBand>,
    /// Score for prices above the last band.
    pub price_floor: f64,
    pub price_unknown: f64,
    pub review_base: f64,
    /// Added on top of `review_base` for a perfect 5-star rating.
    pub review_span: f64,
    pub review_neutral: f64,
    pub market_base: f64,
    pub market_recognized_bonus: f64,
    pub affiliate_base: f64,
    pub affiliate_category_bonus: f64,
    pub affiliate_marketplace_bonus: f64,
    pub data_base: f64,
    pub data_description_bonus: f64,
    pub data_gallery_bonus: f64,
    pub data_features_bonus: f64,
    pub brand_base: f64,
    pub brand_premium_bonus: f64,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            thresholds: TierThresholds::default(),
            recognized_vendors: owned(&[
                "Apple",
                "Samsung",
                "Sony",
                "Amazon",
                "Microsoft",
                "Google",
                "Bose",
                "Anker",
                "Logitech",
                "Nike",
            ]),
            premium_brands: owned(&["Apple", "Sony", "Bose", "Samsung", "Dyson", "Canon"]),
            high_commission_keywords: owned(&[
                "luxury",
                "beauty",
                "electronics",
                "headphones",
                "video games",
                "pc components",
                "musical instruments",
                "software",
            ]),
            preferred_marketplace: Marketplace::Amazon,
            weights: ScoreWeights::default(),
        }
    }
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            high: 85.0,
            good: 70.0,
        }
    }
}

impl Default for ScoreWeights {
    fn default() -> Self {
        let band = |max_price: f64, score: f64| PriceBand { max_price, score };
        Self {
            available: 18.0,
            unavailable: 10.0,
            price_bands: vec![
                band(25.0, 25.0),
                band(50.0, 22.0),
                band(100.0, 20.0),
                band(200.0, 17.0),
                band(500.0, 15.0),
            ],
            price_floor: 15.0,
            price_unknown: 15.0,
            review_base: 10.0,
            review_span: 10.0,
            review_neutral: 15.0,
            market_base: 10.0,
            market_recognized_bonus: 5.0,
            affiliate_base: 10.0,
            affiliate_category_bonus: 3.0,
            affiliate_marketplace_bonus: 2.0,
            data_base: 5.0,
            data_description_bonus: 2.0,
            data_gallery_bonus: 2.0,
            data_features_bonus: 1.0,
            brand_base: 5.0,
            brand_premium_bonus: 3.0,
        }
    }
}

impl ScoringPolicy {
    /// Loads a policy from a YAML file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::PolicyFileIo`] if the file cannot be read,
    /// [`ConfigError::PolicyFileParse`] if it is not valid YAML, and
    /// [`ConfigError::Validation`] if the thresholds or bands are inconsistent.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PolicyFileIo {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_yaml(&content)
    }

    /// Parses and validates a policy from YAML text.
    ///
    /// # Errors
    ///
    /// See [`ScoringPolicy::load`].
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let policy: Self = serde_yaml::from_str(content).map_err(ConfigError::PolicyFileParse)?;
        policy.validate()?;
        Ok(policy)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.thresholds.good > self.thresholds.high {
            return Err(ConfigError::Validation(format!(
                "thresholds.good ({}) must not exceed thresholds.high ({})",
                self.thresholds.good, self.thresholds.high
            )));
        }
        let bands = &self.weights.price_bands;
        for pair in bands.windows(2) {
            if pair[1].max_price <= pair[0].max_price || pair[1].score > pair[0].score {
                return Err(ConfigError::Validation(
                    "price_bands must ascend by max_price and never increase in score".to_string(),
                ));
            }
        }
        if bands
            .last()
            .is_some_and(|last| self.weights.price_floor > last.score)
        {
            return Err(ConfigError::Validation(
                "price_floor must not exceed the last price band score".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Scorable view
// ---------------------------------------------------------------------------

/// Uniform read-only view the scoring engine needs from a product.
pub trait Scorable {
    fn title(&self) -> &str;
    fn is_available(&self) -> bool;
    /// Price in major units, if known.
    fn price_value(&self) -> Option<f64>;
    fn rating(&self) -> Option<f64>;
    fn vendor(&self) -> Option<&str>;
    fn category(&self) -> Option<&str>;
    fn marketplace(&self) -> Marketplace;
    fn has_description(&self) -> bool;
    fn image_count(&self) -> usize;
    fn has_features(&self) -> bool;
}

impl Scorable for Product {
    fn title(&self) -> &str {
        &self.title
    }

    fn is_available(&self) -> bool {
        self.is_available
    }

    fn price_value(&self) -> Option<f64> {
        self.price.as_ref().map(|p| p.value)
    }

    fn rating(&self) -> Option<f64> {
        Product::rating(self)
    }

    fn vendor(&self) -> Option<&str> {
        self.vendor.as_deref()
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn has_features(&self) -> bool {
        !self.features().is_empty()
    }
}

impl Scorable for CatalogProduct {
    fn title(&self) -> &str {
        &self.title
    }

    fn is_available(&self) -> bool {
        self.is_active
    }

    fn price_value(&self) -> Option<f64> {
        self.price.and_then(|p| p.to_f64())
    }

    fn rating(&self) -> Option<f64> {
        None
    }

    fn vendor(&self) -> Option<&str> {
        None
    }

    fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn marketplace(&self) -> Marketplace {
        self.marketplace
    }

    fn has_description(&self) -> bool {
        false
    }

    fn image_count(&self) -> usize {
        0
    }

    fn has_features(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringBreakdown {
    pub availability: f64,
    pub price: f64,
    pub review: f64,
    pub market: f64,
    pub affiliate: f64,
    pub data: f64,
    pub brand: f64,
}

impl ScoringBreakdown {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.availability
            + self.price
            + self.review
            + self.market
            + self.affiliate
            + self.data
            + self.brand
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyAssessment {
    #[serde(rename = "Low Competition")]
    LowCompetition,
    #[serde(rename = "Medium Difficulty")]
    MediumDifficulty,
    #[serde(rename = "High Competition")]
    HighCompetition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AffiliatePotential {
    High,
    Good,
    Medium,
}

/// A product together with its score. Computed per call, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredProduct<P> {
    #[serde(flatten)]
    pub product: P,
    pub scoring_breakdown: ScoringBreakdown,
    pub affiliate_score: f64,
    pub difficulty_assessment: DifficultyAssessment,
    pub affiliate_potential: AffiliatePotential,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ScoringEngine {
    policy: ScoringPolicy,
}

impl ScoringEngine {
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub fn policy(&self) -> &ScoringPolicy {
        &self.policy
    }

    /// Computes the seven sub-scores for `product`.
    #[must_use]
    pub fn score<P: Scorable + ?Sized>(&self, product: &P) -> ScoringBreakdown {
        let w = &self.policy.weights;
        let vendor = product.vendor().map(str::to_lowercase);

        let availability = if product.is_available() {
            w.available
        } else {
            w.unavailable
        };

        let price = match product.price_value() {
            None => w.price_unknown,
            Some(value) => w
                .price_bands
                .iter()
                .find(|band| value <= band.max_price)
                .map_or(w.price_floor, |band| band.score),
        };

        let review = product.rating().map_or(w.review_neutral, |rating| {
            (w.review_base + rating / 5.0 * w.review_span)
                .clamp(w.review_base, w.review_base + w.review_span)
        });

        let market = w.market_base
            + bonus_if(
                matches_any(vendor.as_deref(), &self.policy.recognized_vendors),
                w.market_recognized_bonus,
            );

        let haystack = format!(
            "{} {}",
            product.category().unwrap_or_default(),
            product.title()
        )
        .to_lowercase();
        let affiliate = w.affiliate_base
            + bonus_if(
                matches_any(Some(&haystack), &self.policy.high_commission_keywords),
                w.affiliate_category_bonus,
            )
            + bonus_if(
                product.marketplace() == self.policy.preferred_marketplace,
                w.affiliate_marketplace_bonus,
            );

        let data = w.data_base
            + bonus_if(product.has_description(), w.data_description_bonus)
            + bonus_if(product.image_count() > 1, w.data_gallery_bonus)
            + bonus_if(product.has_features(), w.data_features_bonus);

        let brand = w.brand_base
            + bonus_if(
                matches_any(vendor.as_deref(), &self.policy.premium_brands),
                w.brand_premium_bonus,
            );

        ScoringBreakdown {
            availability,
            price,
            review,
            market,
            affiliate,
            data,
            brand,
        }
    }

    #[must_use]
    pub fn difficulty(&self, score: f64) -> DifficultyAssessment {
        let t = &self.policy.thresholds;
        if score >= t.high {
            DifficultyAssessment::LowCompetition
        } else if score >= t.good {
            DifficultyAssessment::MediumDifficulty
        } else {
            DifficultyAssessment::HighCompetition
        }
    }

    #[must_use]
    pub fn potential(&self, score: f64) -> AffiliatePotential {
        let t = &self.policy.thresholds;
        if score >= t.high {
            AffiliatePotential::High
        } else if score >= t.good {
            AffiliatePotential::Good
        } else {
            AffiliatePotential::Medium
        }
    }

    #[must_use]
    pub fn score_product<P: Scorable>(&self, product: P) -> ScoredProduct<P> {
        let scoring_breakdown = self.score(&product);
        let affiliate_score = round2(scoring_breakdown.total());
        ScoredProduct {
            difficulty_assessment: self.difficulty(affiliate_score),
            affiliate_potential: self.potential(affiliate_score),
            product,
            scoring_breakdown,
            affiliate_score,
        }
    }

    /// Scores every product and sorts by `affiliate_score`, highest first.
    /// Ties keep their input order.
    #[must_use]
    pub fn score_all<P: Scorable>(&self, products: Vec<P>) -> Vec<ScoredProduct<P>> {
        let mut scored: Vec<_> = products
            .into_iter()
            .map(|p| self.score_product(p))
            .collect();
        scored.sort_by(|a, b| b.affiliate_score.total_cmp(&a.affiliate_score));
        scored
    }
}

fn bonus_if(condition: bool, bonus: f64) -> f64 {
    if condition {
        bonus
    } else {
        0.0
    }
}

/// Case-insensitive containment of any `needles` entry in `haystack`.
/// `haystack` must already be lowercase.
fn matches_any(haystack: Option<&str>, needles: &[String]) -> bool {
    haystack.is_some_and(|h| {
        needles
            .iter()
            .any(|n| !n.is_empty() && h.contains(&n.to_lowercase()))
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[path = "scoring_test.rs"]
mod tests;
