//! Keeps each tour's rating summary equal to its live reviews.

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::{ReviewError, ReviewResult};
use super::hooks::{ReviewHooks, ReviewTarget};
use super::models::Review;
use crate::db::{ReviewRepository, TourRepository};
use crate::tours::{RatingSummary, TourId};

/// Recomputes a tour's [`RatingSummary`] from scratch on every review write
#[derive(Clone)]
pub struct RatingAggregator {
    reviews: Arc<dyn ReviewRepository>,
    tours: Arc<dyn TourRepository>,
}

impl RatingAggregator {
    pub fn new(reviews: Arc<dyn ReviewRepository>, tours: Arc<dyn TourRepository>) -> Self {
        Self { reviews, tours }
    }

    /// Recompute and store the rating summary of one tour
    ///
    /// A tour with no reviews gets quantity 0 and the default 4.5 average. A tour that
    /// no longer exists has nothing to keep consistent; the computed summary is returned
    /// without being stored.
    ///
    /// # Errors
    ///
    /// * `ReviewError::Aggregation` - Reading the reviews or writing the tour failed
    pub async fn recompute(&self, tour_id: TourId) -> ReviewResult<RatingSummary> {
        let stats = self
            .reviews
            .rating_stats(tour_id)
            .await
            .map_err(|source| ReviewError::Aggregation { tour_id, source })?;

        let summary = RatingSummary::from_stats(stats);

        let updated = self
            .tours
            .update_ratings(tour_id, &summary)
            .await
            .map_err(|source| ReviewError::Aggregation { tour_id, source })?;

        if updated {
            log::debug!(
                "Tour {} ratings: {} reviews, average {}",
                tour_id,
                summary.quantity,
                summary.average
            );
        } else {
            log::warn!("Skipped rating summary for missing tour {}", tour_id);
        }

        Ok(summary)
    }
}

#[async_trait]
impl ReviewHooks for RatingAggregator {
    async fn after_create(&self, review: &Review) -> ReviewResult<()> {
        self.recompute(review.tour_id).await.map(|_| ())
    }

    async fn after_mutation(&self, target: &ReviewTarget) -> ReviewResult<()> {
        self.recompute(target.tour_id).await.map(|_| ())
    }
}
