//! Weighted rating computation and the inverse solve for required reviews.

pub mod weight;

use chrono::{DateTime, Utc};

use crate::app::{RatecastError, Result};
use crate::domain::review::MAX_RATING;
use crate::domain::{AnalysisResult, ProductId, RatingSnapshot, Review, Statistics};

pub use weight::{weight, weight_for_age, DECAY_HORIZON_DAYS};

const MAX_SCORE: f64 = MAX_RATING as f64;

/// Borrows one review set for the duration of a single analysis.
pub struct RatingAggregator<'a> {
    reviews: &'a [Review],
    now: DateTime<Utc>,
}

impl<'a> RatingAggregator<'a> {
    pub fn new(reviews: &'a [Review], now: DateTime<Utc>) -> Self {
        Self { reviews, now }
    }

    /// Current weighted rating. Zero when nothing carries weight.
    pub fn snapshot(&self) -> RatingSnapshot {
        let (total_weight, weighted_sum) =
            self.reviews.iter().fold((0.0, 0.0), |(tw, ws), review| {
                let w = weight(review, self.now);
                (tw + w, ws + f64::from(review.rating()) * w)
            });

        let current_rating = if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            0.0
        };

        RatingSnapshot {
            current_rating,
            total_weight,
            weighted_sum,
        }
    }

    pub fn statistics(&self) -> Statistics {
        statistics(self.reviews, self.now)
    }

    /// Runs the full computation for one product and target.
    pub fn analyze(&self, product_id: ProductId, target: f64) -> Result<AnalysisResult> {
        let snapshot = self.snapshot();
        let required = required_additional(&snapshot, target)?;
        Ok(AnalysisResult::new(
            product_id,
            target,
            snapshot,
            required,
            self.statistics(),
        ))
    }
}

/// A target is reachable only below the maximum score.
pub fn ensure_valid_target(target: f64) -> Result<()> {
    if target.is_nan() || target >= MAX_SCORE {
        return Err(RatecastError::InvalidTarget(target));
    }
    Ok(())
}

/// Smallest number of fresh 5-star reviews lifting `snapshot` to `target`.
///
/// Fails with `InvalidTarget` when `target >= 5`, before any arithmetic.
pub fn required_additional(snapshot: &RatingSnapshot, target: f64) -> Result<u64> {
    ensure_valid_target(target)?;
    if snapshot.current_rating >= target {
        return Ok(0);
    }

    let numerator = target * snapshot.total_weight - snapshot.weighted_sum;
    let closed_form = (numerator / (MAX_SCORE - target)).ceil();
    let mut k = if closed_form > 0.0 { closed_form as u64 } else { 0 };

    // Rounding in the closed form can land one step off in either direction.
    while k > 0 && meets_target(snapshot, k - 1, target) {
        k -= 1;
    }
    while !meets_target(snapshot, k, target) {
        k += 1;
    }
    Ok(k)
}

fn meets_target(snapshot: &RatingSnapshot, k: u64, target: f64) -> bool {
    let k = k as f64;
    snapshot.weighted_sum + MAX_SCORE * k >= target * (snapshot.total_weight + k)
}

/// Review statistics over all reviews, inert ones included.
pub fn statistics(reviews: &[Review], now: DateTime<Utc>) -> Statistics {
    if reviews.is_empty() {
        return Statistics::default();
    }

    let mut rating_distribution = Statistics::empty_distribution();
    let mut active_reviews = 0;
    let mut age_total = 0i64;
    let mut oldest = i64::MIN;
    let mut newest = i64::MAX;

    for review in reviews {
        *rating_distribution.entry(review.rating()).or_insert(0) += 1;
        let age = review.age_days(now);
        if weight_for_age(age) > 0.0 {
            active_reviews += 1;
        }
        age_total += age;
        oldest = oldest.max(age);
        newest = newest.min(age);
    }

    Statistics {
        total_reviews: reviews.len(),
        active_reviews,
        rating_distribution,
        average_age_days: age_total as f64 / reviews.len() as f64,
        oldest_review_days: oldest,
        newest_review_days: newest,
    }
}
