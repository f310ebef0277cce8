//! Hooks run around review writes.
//!
//! Updates and deletes are two-phase: the service reads the review first and captures a
//! [`ReviewTarget`], performs the mutation, then hands the captured target to every hook.
//! A deleted review can therefore still be attributed to its tour.

use async_trait::async_trait;

use super::errors::ReviewResult;
use super::models::{Review, ReviewId};
use crate::auth::UserId;
use crate::tours::TourId;

/// Identity of a review captured before it is updated or deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReviewTarget {
    pub review_id: ReviewId,
    pub tour_id: TourId,
    pub user_id: UserId,
}

impl From<&Review> for ReviewTarget {
    fn from(review: &Review) -> Self {
        Self {
            review_id: review.id,
            tour_id: review.tour_id,
            user_id: review.user_id,
        }
    }
}

/// Callbacks invoked synchronously after each committed review write
#[async_trait]
pub trait ReviewHooks: Send + Sync {
    /// Called after a review was inserted
    async fn after_create(&self, review: &Review) -> ReviewResult<()>;

    /// Called after the review identified by `target` was updated or deleted
    async fn after_mutation(&self, target: &ReviewTarget) -> ReviewResult<()>;
}
