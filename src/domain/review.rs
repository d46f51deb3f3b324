use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// A single customer review as extracted from a listing.
///
/// `observed_at` is resolved once at extraction time and never re-resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    rating: u8,
    observed_at: DateTime<Utc>,
    text: Option<String>,
}

impl Review {
    /// Returns `None` when `rating` is outside `1..=5`.
    pub fn new(rating: u8, observed_at: DateTime<Utc>, text: Option<String>) -> Option<Self> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return None;
        }
        Some(Self {
            rating,
            observed_at,
            text,
        })
    }

    pub fn rating(&self) -> u8 {
        self.rating
    }

    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Whole days between `observed_at` and `now`, never negative.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.observed_at).num_days().max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_rejects_out_of_range_ratings() {
        assert!(Review::new(0, now(), None).is_none());
        assert!(Review::new(6, now(), None).is_none());
        assert!(Review::new(1, now(), None).is_some());
        assert!(Review::new(5, now(), None).is_some());
    }

    #[test]
    fn test_age_days_floors_partial_days() {
        let review = Review::new(4, now() - Duration::hours(47), None).unwrap();
        assert_eq!(review.age_days(now()), 1);
    }

    #[test]
    fn test_age_days_clamps_future_dates() {
        let review = Review::new(4, now() + Duration::days(3), None).unwrap();
        assert_eq!(review.age_days(now()), 0);
    }

    #[test]
    fn test_text_is_optional() {
        let review = Review::new(5, now(), Some("Great".into())).unwrap();
        assert_eq!(review.text(), Some("Great"));
        assert_eq!(Review::new(5, now(), None).unwrap().text(), None);
    }
}
