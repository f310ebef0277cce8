//! Review data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ReviewError, ReviewResult};
use crate::auth::UserId;
use crate::tours::TourId;

/// Review ID type
pub type ReviewId = i64;

/// Lowest accepted rating
pub const MIN_RATING: i16 = 1;
/// Highest accepted rating
pub const MAX_RATING: i16 = 5;

/// Review model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Review {
    pub id: ReviewId,
    pub tour_id: TourId,
    pub user_id: UserId,
    pub rating: i16,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Count and mean of the ratings attached to one tour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingStats {
    pub count: i64,
    pub mean: f64,
}

impl RatingStats {
    /// Aggregate a slice of ratings; `None` for an empty slice
    pub fn from_ratings(ratings: &[i16]) -> Option<Self> {
        if ratings.is_empty() {
            return None;
        }
        let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
        let count = ratings.len() as i64;
        Some(Self {
            count,
            mean: sum as f64 / count as f64,
        })
    }
}

/// A review that passed construction checks and is ready to insert
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    tour_id: TourId,
    user_id: UserId,
    rating: i16,
    text: String,
}

impl NewReview {
    /// # Errors
    ///
    /// * `ReviewError::Validation` - Rating outside 1..=5 or blank text
    pub fn new(tour_id: TourId, user_id: UserId, rating: i16, text: &str) -> ReviewResult<Self> {
        Ok(Self {
            tour_id,
            user_id,
            rating: validate_rating(rating)?,
            text: validate_text(text)?,
        })
    }

    pub fn tour_id(&self) -> TourId {
        self.tour_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn rating(&self) -> i16 {
        self.rating
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Raw review update as sent by a caller
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewChanges {
    pub rating: Option<i16>,
    pub text: Option<String>,
}

/// Validated partial update. The tour and author of a review never change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewPatch {
    rating: Option<i16>,
    text: Option<String>,
}

impl ReviewPatch {
    /// # Errors
    ///
    /// * `ReviewError::Validation` - A provided field is out of range or blank
    pub fn new(changes: ReviewChanges) -> ReviewResult<Self> {
        Ok(Self {
            rating: changes.rating.map(validate_rating).transpose()?,
            text: changes.text.as_deref().map(validate_text).transpose()?,
        })
    }

    pub fn rating(&self) -> Option<i16> {
        self.rating
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.text.is_none()
    }

    /// Apply the patch to an in-memory review
    pub fn apply(&self, review: &mut Review) {
        if let Some(rating) = self.rating {
            review.rating = rating;
        }
        if let Some(text) = &self.text {
            review.text = text.clone();
        }
    }
}

fn validate_rating(rating: i16) -> ReviewResult<i16> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(rating)
    } else {
        Err(ReviewError::Validation(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}, got {rating}"
        )))
    }
}

fn validate_text(text: &str) -> ReviewResult<String> {
    let text = text.trim();
    if text.is_empty() {
        Err(ReviewError::Validation("Review can not be empty".to_string()))
    } else {
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_review_rejects_out_of_range_rating() {
        assert!(NewReview::new(1, 1, 0, "meh").is_err());
        assert!(NewReview::new(1, 1, 6, "wow").is_err());
        assert_eq!(NewReview::new(1, 1, 5, " wow ").unwrap().text(), "wow");
    }

    #[test]
    fn test_new_review_rejects_blank_text() {
        let err = NewReview::new(1, 1, 4, "   ").unwrap_err();
        assert!(matches!(err, ReviewError::Validation(_)));
    }

    #[test]
    fn test_patch_validates_only_provided_fields() {
        let patch = ReviewPatch::new(ReviewChanges {
            rating: Some(2),
            text: None,
        })
        .unwrap();
        assert_eq!(patch.rating(), Some(2));
        assert_eq!(patch.text(), None);

        assert!(
            ReviewPatch::new(ReviewChanges {
                rating: None,
                text: Some(String::new()),
            })
            .is_err()
        );
    }

    #[test]
    fn test_rating_stats_from_ratings() {
        assert_eq!(RatingStats::from_ratings(&[]), None);
        let stats = RatingStats::from_ratings(&[4, 5, 3]).unwrap();
        assert_eq!(stats.count, 3);
        assert!((stats.mean - 4.0).abs() < f64::EPSILON);
    }
}
