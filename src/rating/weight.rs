//! Linear time-decay weighting.
//!
//! A review counts fully on the day it is written and loses 1/365 of its
//! weight per day until it becomes inert at one year.

use chrono::{DateTime, Utc};

use crate::domain::Review;

/// Age in days at which a review stops contributing.
pub const DECAY_HORIZON_DAYS: i64 = 365;

/// Weight for a review of the given age: `max(0, 1 - age/365)`.
///
/// Negative ages are treated as zero, so the result is always in `[0, 1]`.
pub fn weight_for_age(age_days: i64) -> f64 {
    let age = age_days.max(0) as f64;
    (1.0 - age / DECAY_HORIZON_DAYS as f64).max(0.0)
}

/// Weight of `review` relative to `now`.
pub fn weight(review: &Review, now: DateTime<Utc>) -> f64 {
    weight_for_age(review.age_days(now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_review_has_full_weight() {
        assert_eq!(weight_for_age(0), 1.0);
    }

    #[test]
    fn test_half_year_is_about_half() {
        let w = weight_for_age(182);
        assert!(w > 0.49 && w < 0.51);
    }

    #[test]
    fn test_inert_after_horizon() {
        assert_eq!(weight_for_age(365), 0.0);
        assert_eq!(weight_for_age(400), 0.0);
        assert_eq!(weight_for_age(10_000), 0.0);
    }

    #[test]
    fn test_monotonically_non_increasing() {
        let mut previous = weight_for_age(0);
        for age in 1..800 {
            let w = weight_for_age(age);
            assert!(w <= previous, "weight rose at age {}", age);
            assert!((0.0..=1.0).contains(&w));
            previous = w;
        }
    }

    #[test]
    fn test_negative_age_is_clamped() {
        assert_eq!(weight_for_age(-10), 1.0);
    }
}
