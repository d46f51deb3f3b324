use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::app::{RatecastError, Result};
use crate::domain::review::{MAX_RATING, MIN_RATING};
use crate::domain::ProductId;

pub const DEFAULT_TARGET_RATING: f64 = 4.5;

/// One analysis request as accepted from any front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub input: String,
    pub target_rating: f64,
}

impl AnalysisRequest {
    /// Trims `input` and checks that `target_rating` lies in `[1.0, 5.0]`.
    pub fn new(input: &str, target_rating: f64) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RatecastError::InvalidRequest(
                "product URL or identifier must not be empty".into(),
            ));
        }
        if !target_rating.is_finite() || !(1.0..=5.0).contains(&target_rating) {
            return Err(RatecastError::InvalidRequest(format!(
                "target rating {} is outside [1.0, 5.0]",
                target_rating
            )));
        }
        Ok(Self {
            input: input.to_string(),
            target_rating,
        })
    }
}

/// Weighted totals of one review set at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RatingSnapshot {
    pub current_rating: f64,
    pub total_weight: f64,
    pub weighted_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_reviews: usize,
    pub active_reviews: usize,
    pub rating_distribution: BTreeMap<u8, usize>,
    pub average_age_days: f64,
    pub oldest_review_days: i64,
    pub newest_review_days: i64,
}

impl Statistics {
    /// Histogram with every rating key present and zero counts.
    pub fn empty_distribution() -> BTreeMap<u8, usize> {
        (MIN_RATING..=MAX_RATING).map(|r| (r, 0)).collect()
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self {
            total_reviews: 0,
            active_reviews: 0,
            rating_distribution: Self::empty_distribution(),
            average_age_days: 0.0,
            oldest_review_days: 0,
            newest_review_days: 0,
        }
    }
}

/// The response contract shared by every front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub product_id: ProductId,
    pub current_rating: f64,
    pub target_rating: f64,
    pub required_5star_reviews: u64,
    pub total_weight: f64,
    pub weighted_sum: f64,
    pub statistics: Statistics,
}

impl AnalysisResult {
    /// Builds the response, rounding the presented figures.
    pub fn new(
        product_id: ProductId,
        target_rating: f64,
        snapshot: RatingSnapshot,
        required_5star_reviews: u64,
        mut statistics: Statistics,
    ) -> Self {
        statistics.average_age_days = round_to(statistics.average_age_days, 1);
        Self {
            product_id,
            current_rating: round_to(snapshot.current_rating, 2),
            target_rating,
            required_5star_reviews,
            total_weight: round_to(snapshot.total_weight, 2),
            weighted_sum: round_to(snapshot.weighted_sum, 2),
            statistics,
        }
    }

    pub fn goal_reached(&self) -> bool {
        self.required_5star_reviews == 0
    }
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
