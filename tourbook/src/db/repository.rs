//! Repository trait definitions for testability and dependency injection.
//!
//! This module provides trait-based abstractions over the persistence layer. Row-level
//! visibility (inactive users, secret tours) is never applied implicitly: every read
//! that can hide rows takes a scope argument, so the filter is visible at the call site.

use async_trait::async_trait;

use super::errors::StoreResult;
use crate::auth::{Credential, NewUser, ProfileUpdate, User, UserId};
use crate::reviews::{NewReview, RatingStats, Review, ReviewId, ReviewPatch};
use crate::tours::{NewTour, RatingSummary, Tour, TourId};

/// Which users a read may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    /// Only accounts that have not been deactivated
    Active,
    /// Every account
    All,
}

impl UserScope {
    pub fn admits(&self, user: &User) -> bool {
        match self {
            UserScope::Active => user.active,
            UserScope::All => true,
        }
    }
}

/// Which tours a read may return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TourScope {
    /// Hide secret tours
    Public,
    /// Every tour
    All,
}

impl TourScope {
    pub fn admits(&self, tour: &Tour) -> bool {
        match self {
            TourScope::Public => !tour.secret,
            TourScope::All => true,
        }
    }
}

/// Trait for user repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user; fails with `StoreError::UniqueViolation` on a duplicate email
    async fn create_user(&self, user: &NewUser, password_hash: &str) -> StoreResult<User>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId, scope: UserScope) -> StoreResult<Option<User>>;

    /// Find every listed user visible under `scope`, in no particular order
    async fn find_many(&self, user_ids: &[UserId], scope: UserScope) -> StoreResult<Vec<User>>;

    /// List users ordered by ID
    async fn list_users(&self, scope: UserScope) -> StoreResult<Vec<User>>;

    /// Find user by (lowercased) email
    async fn find_by_email(&self, email: &str, scope: UserScope) -> StoreResult<Option<User>>;

    /// Find the user holding a pending reset token with this digest
    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        scope: UserScope,
    ) -> StoreResult<Option<User>>;

    /// Replace all credential fields in one write
    async fn update_credential(&self, user_id: UserId, credential: &Credential)
    -> StoreResult<()>;

    /// Replace the credential only while the stored reset digest still equals
    /// `token_hash`.
    ///
    /// Returns `false` when another write already cleared or replaced the token.
    async fn redeem_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        credential: &Credential,
    ) -> StoreResult<bool>;

    /// Apply a profile update and return the stored user
    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>>;

    /// Activate or deactivate an account
    async fn set_active(&self, user_id: UserId, active: bool) -> StoreResult<()>;

    /// Delete an account and its reviews; `false` if it does not exist
    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool>;
}

/// Trait for tour repository operations
#[async_trait]
pub trait TourRepository: Send + Sync {
    /// Insert a tour with an empty rating summary
    async fn create_tour(&self, tour: &NewTour) -> StoreResult<Tour>;

    /// Find tour by ID
    async fn find_by_id(&self, tour_id: TourId, scope: TourScope) -> StoreResult<Option<Tour>>;

    /// List tours ordered by ID
    async fn list(&self, scope: TourScope) -> StoreResult<Vec<Tour>>;

    /// Overwrite the editable fields of a tour, keeping its rating summary.
    ///
    /// Returns `None` when no tour has this ID.
    async fn update_tour(&self, tour_id: TourId, tour: &NewTour) -> StoreResult<Option<Tour>>;

    /// Delete a tour and its reviews; `false` if it does not exist
    async fn delete_tour(&self, tour_id: TourId) -> StoreResult<bool>;

    /// Overwrite both summary fields in a single update.
    ///
    /// Returns `false` when no tour has this ID.
    async fn update_ratings(&self, tour_id: TourId, summary: &RatingSummary)
    -> StoreResult<bool>;
}

/// Trait for review repository operations
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Insert a review; fails with `StoreError::UniqueViolation` when the user already
    /// reviewed the tour
    async fn create_review(&self, review: &NewReview) -> StoreResult<Review>;

    /// Find review by ID
    async fn find_by_id(&self, review_id: ReviewId) -> StoreResult<Option<Review>>;

    /// List reviews for a tour, oldest first
    async fn list_for_tour(&self, tour_id: TourId) -> StoreResult<Vec<Review>>;

    /// List every review, oldest first
    async fn list_all(&self) -> StoreResult<Vec<Review>>;

    /// Apply a patch; `None` if the review no longer exists
    async fn update_review(
        &self,
        review_id: ReviewId,
        patch: &ReviewPatch,
    ) -> StoreResult<Option<Review>>;

    /// Delete a review; `false` if it no longer exists
    async fn delete_review(&self, review_id: ReviewId) -> StoreResult<bool>;

    /// Count and mean rating for one tour; `None` when the tour has no reviews
    async fn rating_stats(&self, tour_id: TourId) -> StoreResult<Option<RatingStats>>;
}
