//! Review writes with hook dispatch.

use std::sync::Arc;

use super::errors::{ReviewError, ReviewResult};
use super::hooks::{ReviewHooks, ReviewTarget};
use super::models::{NewReview, Review, ReviewId, ReviewPatch};
use crate::auth::{Role, User};
use crate::db::{ReviewRepository, TourRepository, TourScope};
use crate::tours::TourId;

/// Creates, updates and deletes reviews and runs the registered hooks after each write.
///
/// Hooks run inline, in registration order. When one fails, the review write stays
/// committed and the failure is returned to the caller.
#[derive(Clone)]
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository>,
    tours: Arc<dyn TourRepository>,
    hooks: Vec<Arc<dyn ReviewHooks>>,
}

impl ReviewService {
    /// Create a service without hooks
    pub fn new(reviews: Arc<dyn ReviewRepository>, tours: Arc<dyn TourRepository>) -> Self {
        Self {
            reviews,
            tours,
            hooks: Vec::new(),
        }
    }

    /// Register a hook to run after every review write
    pub fn with_hook(mut self, hook: Arc<dyn ReviewHooks>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// Post a review for a tour
    ///
    /// # Errors
    ///
    /// * `ReviewError::Forbidden` - Only regular users write reviews
    /// * `ReviewError::Validation` - Rating outside 1..=5 or blank text
    /// * `ReviewError::TourNotFound` - No such tour
    /// * `ReviewError::UniquenessViolation` - The user already reviewed this tour
    /// * `ReviewError::Aggregation` - Review saved, summary refresh failed
    pub async fn create(
        &self,
        actor: &User,
        tour_id: TourId,
        rating: i16,
        text: &str,
    ) -> ReviewResult<Review> {
        if actor.role != Role::User {
            return Err(ReviewError::Forbidden);
        }

        let new_review = NewReview::new(tour_id, actor.id, rating, text)?;

        if self.tours.find_by_id(tour_id, TourScope::All).await?.is_none() {
            return Err(ReviewError::TourNotFound(tour_id));
        }

        let review = self
            .reviews
            .create_review(&new_review)
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ReviewError::UniquenessViolation {
                        tour_id,
                        user_id: actor.id,
                    }
                } else {
                    ReviewError::Store(e)
                }
            })?;

        log::info!("User {} reviewed tour {}", actor.id, tour_id);

        for hook in &self.hooks {
            hook.after_create(&review).await?;
        }

        Ok(review)
    }

    /// Change the rating and/or text of a review
    ///
    /// # Errors
    ///
    /// * `ReviewError::ReviewNotFound` - No such review
    /// * `ReviewError::Forbidden` - Actor is neither the author nor an admin
    /// * `ReviewError::Aggregation` - Review saved, summary refresh failed
    pub async fn update(
        &self,
        actor: &User,
        review_id: ReviewId,
        patch: ReviewPatch,
    ) -> ReviewResult<Review> {
        let (current, target) = self.capture_target(actor, review_id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let review = self
            .reviews
            .update_review(review_id, &patch)
            .await?
            .ok_or(ReviewError::ReviewNotFound(review_id))?;

        self.run_mutation_hooks(&target).await?;
        Ok(review)
    }

    /// Delete a review
    ///
    /// # Errors
    ///
    /// * `ReviewError::ReviewNotFound` - No such review
    /// * `ReviewError::Forbidden` - Actor is neither the author nor an admin
    /// * `ReviewError::Aggregation` - Review deleted, summary refresh failed
    pub async fn delete(&self, actor: &User, review_id: ReviewId) -> ReviewResult<()> {
        let (_, target) = self.capture_target(actor, review_id).await?;

        if !self.reviews.delete_review(review_id).await? {
            return Err(ReviewError::ReviewNotFound(review_id));
        }
        log::info!("Review {} on tour {} deleted", review_id, target.tour_id);

        self.run_mutation_hooks(&target).await
    }

    /// Get a review by ID
    pub async fn get(&self, review_id: ReviewId) -> ReviewResult<Review> {
        self.reviews
            .find_by_id(review_id)
            .await?
            .ok_or(ReviewError::ReviewNotFound(review_id))
    }

    /// List reviews of one tour
    pub async fn list_for_tour(&self, tour_id: TourId) -> ReviewResult<Vec<Review>> {
        Ok(self.reviews.list_for_tour(tour_id).await?)
    }

    /// List every review
    pub async fn list_all(&self) -> ReviewResult<Vec<Review>> {
        Ok(self.reviews.list_all().await?)
    }

    /// Phase one of a mutation: load the review, check ownership, remember its tour
    async fn capture_target(
        &self,
        actor: &User,
        review_id: ReviewId,
    ) -> ReviewResult<(Review, ReviewTarget)> {
        let review = self.get(review_id).await?;
        if review.user_id != actor.id && actor.role != Role::Admin {
            return Err(ReviewError::Forbidden);
        }

        let target = ReviewTarget::from(&review);
        Ok((review, target))
    }

    async fn run_mutation_hooks(&self, target: &ReviewTarget) -> ReviewResult<()> {
        for hook in &self.hooks {
            hook.after_mutation(target).await?;
        }
        Ok(())
    }
}
