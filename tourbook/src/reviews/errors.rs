//! Review error types.

use thiserror::Error;

use super::models::ReviewId;
use crate::auth::UserId;
use crate::db::StoreError;
use crate::tours::TourId;

/// Review errors
#[derive(Debug, Error)]
pub enum ReviewError {
    /// Persistence error on the review write itself
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Missing or out-of-range field
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The user already reviewed this tour
    #[error("User {user_id} has already reviewed tour {tour_id}")]
    UniquenessViolation { tour_id: TourId, user_id: UserId },

    /// Review not found
    #[error("Review {0} not found")]
    ReviewNotFound(ReviewId),

    /// Tour not found
    #[error("Tour {0} not found")]
    TourNotFound(TourId),

    /// Actor may not touch this review
    #[error("You do not have permission to perform this action")]
    Forbidden,

    /// The review write committed but the tour's rating summary could not be refreshed
    #[error("Rating summary for tour {tour_id} could not be recomputed: {source}")]
    Aggregation {
        tour_id: TourId,
        #[source]
        source: StoreError,
    },
}

impl ReviewError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            ReviewError::Store(_) => "Internal server error".to_string(),
            ReviewError::UniquenessViolation { .. } => {
                "You have already reviewed this tour".to_string()
            }
            ReviewError::Aggregation { .. } => {
                "Review saved, but tour ratings are temporarily out of date".to_string()
            }
            ReviewError::ReviewNotFound(_) => "Review not found".to_string(),
            ReviewError::TourNotFound(_) => "Tour not found".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for review operations
pub type ReviewResult<T> = Result<T, ReviewError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregation_error_keeps_source() {
        use std::error::Error as _;

        let err = ReviewError::Aggregation {
            tour_id: 9,
            source: StoreError::Unavailable("tours offline".to_string()),
        };
        assert!(err.to_string().contains("tour 9"));
        assert!(err.source().is_some());
        assert!(!err.client_message().contains("offline"));
    }
}
