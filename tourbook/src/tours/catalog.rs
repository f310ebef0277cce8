//! Tour creation, lookup, update and removal.

use std::sync::Arc;

use super::errors::{TourError, TourResult};
use super::models::{NewTour, Tour, TourChanges, TourDetails, TourDraft, TourId};
use crate::auth::{Role, UserId};
use crate::db::{StoreError, TourRepository, TourScope, UserRepository, UserScope};

/// Validates and stores tours, and reads them back under an explicit scope
#[derive(Clone)]
pub struct TourCatalog {
    tours: Arc<dyn TourRepository>,
    users: Arc<dyn UserRepository>,
}

impl TourCatalog {
    /// Create a new catalog
    ///
    /// # Arguments
    ///
    /// * `tours` - Tour repository
    /// * `users` - Accounts that guide ids are checked against and resolved from
    pub fn new(tours: Arc<dyn TourRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { tours, users }
    }

    /// Validate a draft and insert it with an empty rating summary
    ///
    /// # Errors
    ///
    /// * `TourError::Validation` - Draft violates a field constraint, or a listed guide
    ///   is not an active guide account
    /// * `TourError::NameTaken` - Another tour has this name
    pub async fn create(&self, draft: TourDraft) -> TourResult<Tour> {
        let new_tour = NewTour::new(draft)?;
        self.check_guides(&new_tour.draft().guide_ids).await?;

        let tour = self
            .tours
            .create_tour(&new_tour)
            .await
            .map_err(map_name_conflict)?;

        log::info!("Created tour {} ({})", tour.id, tour.slug);
        Ok(tour)
    }

    /// Get a tour visible under `scope`
    pub async fn get(&self, tour_id: TourId, scope: TourScope) -> TourResult<Tour> {
        self.tours
            .find_by_id(tour_id, scope)
            .await?
            .ok_or(TourError::TourNotFound(tour_id))
    }

    /// Get a tour with its active guides resolved, in the tour's guide order
    pub async fn get_with_guides(
        &self,
        tour_id: TourId,
        scope: TourScope,
    ) -> TourResult<TourDetails> {
        let tour = self.get(tour_id, scope).await?;
        let mut found = self
            .users
            .find_many(&tour.guide_ids, UserScope::Active)
            .await?;

        let guides = tour
            .guide_ids
            .iter()
            .filter_map(|id| {
                let index = found.iter().position(|user| user.id == *id)?;
                Some(found.swap_remove(index))
            })
            .collect();

        Ok(TourDetails { tour, guides })
    }

    /// List tours visible under `scope`
    pub async fn list(&self, scope: TourScope) -> TourResult<Vec<Tour>> {
        Ok(self.tours.list(scope).await?)
    }

    /// Apply a partial update and re-validate the whole tour
    ///
    /// The slug follows a changed name. The rating summary is left untouched.
    ///
    /// # Errors
    ///
    /// * `TourError::TourNotFound` - No such tour
    /// * `TourError::Validation` - The merged tour violates a field constraint
    /// * `TourError::NameTaken` - Another tour has the new name
    pub async fn update(&self, tour_id: TourId, changes: TourChanges) -> TourResult<Tour> {
        let current = self.get(tour_id, TourScope::All).await?;
        let new_tour = NewTour::new(changes.apply(current.to_draft()))?;
        if new_tour.draft().guide_ids != current.guide_ids {
            self.check_guides(&new_tour.draft().guide_ids).await?;
        }

        let tour = self
            .tours
            .update_tour(tour_id, &new_tour)
            .await
            .map_err(map_name_conflict)?
            .ok_or(TourError::TourNotFound(tour_id))?;

        log::info!("Updated tour {} ({})", tour.id, tour.slug);
        Ok(tour)
    }

    /// Delete a tour; its reviews go with it
    pub async fn delete(&self, tour_id: TourId) -> TourResult<()> {
        if !self.tours.delete_tour(tour_id).await? {
            return Err(TourError::TourNotFound(tour_id));
        }
        log::info!("Deleted tour {}", tour_id);
        Ok(())
    }

    async fn check_guides(&self, guide_ids: &[UserId]) -> TourResult<()> {
        if guide_ids.is_empty() {
            return Ok(());
        }

        let found = self.users.find_many(guide_ids, UserScope::Active).await?;
        for id in guide_ids {
            let is_guide = found
                .iter()
                .any(|user| user.id == *id && matches!(user.role, Role::Guide | Role::LeadGuide));
            if !is_guide {
                return Err(TourError::Validation(format!(
                    "User {id} is not an active guide"
                )));
            }
        }
        Ok(())
    }
}

fn map_name_conflict(err: StoreError) -> TourError {
    if err.is_unique_violation() {
        TourError::NameTaken
    } else {
        TourError::Store(err)
    }
}
