//! In-memory implementation of every repository trait.
//!
//! Enforces the same unique indexes as the PostgreSQL schema (user email, tour name,
//! review `(tour_id, user_id)`), so services behave identically against either backend.
//! Individual collections can be switched into a failing mode to exercise error paths.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use super::errors::{StoreError, StoreResult};
use super::repository::{ReviewRepository, TourRepository, TourScope, UserRepository, UserScope};
use crate::auth::{Credential, NewUser, ProfileUpdate, User, UserId};
use crate::reviews::{NewReview, RatingStats, Review, ReviewId, ReviewPatch};
use crate::tours::{NewTour, RatingSummary, Tour, TourId};

#[derive(Default)]
struct MemoryState {
    users: BTreeMap<UserId, User>,
    tours: BTreeMap<TourId, Tour>,
    reviews: BTreeMap<ReviewId, Review>,
    next_user_id: i64,
    next_tour_id: i64,
    next_review_id: i64,
}

impl MemoryState {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

#[derive(Default)]
struct FailureSwitches {
    tour_writes: AtomicBool,
    review_reads: AtomicBool,
}

/// Shared in-memory store; clones share the same data
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
    failures: Arc<FailureSwitches>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every tour write fail with `StoreError::Unavailable`
    pub fn fail_tour_writes(&self, fail: bool) {
        self.failures.tour_writes.store(fail, Ordering::SeqCst);
    }

    /// Make review aggregate reads fail with `StoreError::Unavailable`
    pub fn fail_review_reads(&self, fail: bool) {
        self.failures.review_reads.store(fail, Ordering::SeqCst);
    }

    fn check(switch: &AtomicBool, what: &str) -> StoreResult<()> {
        if switch.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable(format!("{what} disabled")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &NewUser, password_hash: &str) -> StoreResult<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("users_email_key".to_string()));
        }

        let id = MemoryState::next_id(&mut state.next_user_id);
        let stored = User {
            id,
            name: user.name.clone(),
            email: user.email.clone(),
            photo: user.photo.clone(),
            role: user.role,
            active: true,
            credential: Credential::new(password_hash.to_string()),
        };
        state.users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, user_id: UserId, scope: UserScope) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .get(&user_id)
            .filter(|u| scope.admits(u))
            .cloned())
    }

    async fn find_many(&self, user_ids: &[UserId], scope: UserScope) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(user_ids
            .iter()
            .filter_map(|id| state.users.get(id))
            .filter(|u| scope.admits(u))
            .cloned()
            .collect())
    }

    async fn list_users(&self, scope: UserScope) -> StoreResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| scope.admits(u))
            .cloned()
            .collect())
    }

    async fn find_by_email(&self, email: &str, scope: UserScope) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .find(|u| u.email == email && scope.admits(u))
            .cloned())
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        scope: UserScope,
    ) -> StoreResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state
            .users
            .values()
            .filter(|u| scope.admits(u))
            .find(|u| {
                u.credential
                    .password_reset_token_hash
                    .as_deref()
                    .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(token_hash.as_bytes())))
            })
            .cloned())
    }

    async fn update_credential(
        &self,
        user_id: UserId,
        credential: &Credential,
    ) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.credential = credential.clone();
        }
        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        credential: &Credential,
    ) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        let Some(user) = state.users.get_mut(&user_id) else {
            return Ok(false);
        };

        let matches = user
            .credential
            .password_reset_token_hash
            .as_deref()
            .is_some_and(|stored| bool::from(stored.as_bytes().ct_eq(token_hash.as_bytes())));
        if matches {
            user.credential = credential.clone();
        }
        Ok(matches)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>> {
        let mut state = self.state.write().await;
        if let Some(email) = &update.email {
            if state
                .users
                .values()
                .any(|u| u.id != user_id && &u.email == email)
            {
                return Err(StoreError::UniqueViolation("users_email_key".to_string()));
            }
        }

        Ok(state.users.get_mut(&user_id).map(|user| {
            if let Some(name) = &update.name {
                user.name = name.clone();
            }
            if let Some(email) = &update.email {
                user.email = email.clone();
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            user.clone()
        }))
    }

    async fn set_active(&self, user_id: UserId, active: bool) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.get_mut(&user_id) {
            user.active = active;
        }
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        if state.users.remove(&user_id).is_none() {
            return Ok(false);
        }
        state.reviews.retain(|_, r| r.user_id != user_id);
        Ok(true)
    }
}

/// Tour built from validated input; identity, ratings and timestamps are placeholders
fn tour_fields(tour: &NewTour) -> Tour {
    let draft = tour.draft().clone();
    Tour {
        id: 0,
        name: draft.name,
        slug: tour.slug().to_string(),
        duration: draft.duration,
        max_group_size: draft.max_group_size,
        difficulty: draft.difficulty,
        price: draft.price,
        price_discount: draft.price_discount,
        summary: draft.summary,
        description: draft.description,
        image_cover: draft.image_cover,
        images: draft.images,
        start_dates: draft.start_dates,
        guide_ids: draft.guide_ids,
        secret: draft.secret,
        ratings: RatingSummary::empty(),
        created_at: Utc::now(),
    }
}

#[async_trait]
impl TourRepository for MemoryStore {
    async fn create_tour(&self, tour: &NewTour) -> StoreResult<Tour> {
        Self::check(&self.failures.tour_writes, "tour writes")?;
        let mut state = self.state.write().await;
        let draft = tour.draft();
        if state.tours.values().any(|t| t.name == draft.name) {
            return Err(StoreError::UniqueViolation("tours_name_key".to_string()));
        }

        let id = MemoryState::next_id(&mut state.next_tour_id);
        let stored = Tour {
            id,
            ratings: RatingSummary::empty(),
            created_at: Utc::now(),
            ..tour_fields(tour)
        };
        state.tours.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, tour_id: TourId, scope: TourScope) -> StoreResult<Option<Tour>> {
        let state = self.state.read().await;
        Ok(state
            .tours
            .get(&tour_id)
            .filter(|t| scope.admits(t))
            .cloned())
    }

    async fn list(&self, scope: TourScope) -> StoreResult<Vec<Tour>> {
        let state = self.state.read().await;
        Ok(state
            .tours
            .values()
            .filter(|t| scope.admits(t))
            .cloned()
            .collect())
    }

    async fn update_tour(&self, tour_id: TourId, tour: &NewTour) -> StoreResult<Option<Tour>> {
        Self::check(&self.failures.tour_writes, "tour writes")?;
        let mut state = self.state.write().await;
        let name = &tour.draft().name;
        if state
            .tours
            .values()
            .any(|t| t.id != tour_id && &t.name == name)
        {
            return Err(StoreError::UniqueViolation("tours_name_key".to_string()));
        }

        Ok(state.tours.get_mut(&tour_id).map(|stored| {
            *stored = Tour {
                id: stored.id,
                ratings: stored.ratings,
                created_at: stored.created_at,
                ..tour_fields(tour)
            };
            stored.clone()
        }))
    }

    async fn delete_tour(&self, tour_id: TourId) -> StoreResult<bool> {
        Self::check(&self.failures.tour_writes, "tour writes")?;
        let mut state = self.state.write().await;
        if state.tours.remove(&tour_id).is_none() {
            return Ok(false);
        }
        state.reviews.retain(|_, r| r.tour_id != tour_id);
        Ok(true)
    }

    async fn update_ratings(
        &self,
        tour_id: TourId,
        summary: &RatingSummary,
    ) -> StoreResult<bool> {
        Self::check(&self.failures.tour_writes, "tour writes")?;
        let mut state = self.state.write().await;
        Ok(match state.tours.get_mut(&tour_id) {
            Some(tour) => {
                tour.ratings = *summary;
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn create_review(&self, review: &NewReview) -> StoreResult<Review> {
        let mut state = self.state.write().await;
        if state
            .reviews
            .values()
            .any(|r| r.tour_id == review.tour_id() && r.user_id == review.user_id())
        {
            return Err(StoreError::UniqueViolation(
                "reviews_tour_id_user_id_key".to_string(),
            ));
        }

        let id = MemoryState::next_id(&mut state.next_review_id);
        let stored = Review {
            id,
            tour_id: review.tour_id(),
            user_id: review.user_id(),
            rating: review.rating(),
            text: review.text().to_string(),
            created_at: Utc::now(),
        };
        state.reviews.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, review_id: ReviewId) -> StoreResult<Option<Review>> {
        let state = self.state.read().await;
        Ok(state.reviews.get(&review_id).cloned())
    }

    async fn list_for_tour(&self, tour_id: TourId) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state
            .reviews
            .values()
            .filter(|r| r.tour_id == tour_id)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> StoreResult<Vec<Review>> {
        let state = self.state.read().await;
        Ok(state.reviews.values().cloned().collect())
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        patch: &ReviewPatch,
    ) -> StoreResult<Option<Review>> {
        let mut state = self.state.write().await;
        Ok(state.reviews.get_mut(&review_id).map(|review| {
            patch.apply(review);
            review.clone()
        }))
    }

    async fn delete_review(&self, review_id: ReviewId) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        Ok(state.reviews.remove(&review_id).is_some())
    }

    async fn rating_stats(&self, tour_id: TourId) -> StoreResult<Option<RatingStats>> {
        Self::check(&self.failures.review_reads, "review reads")?;
        let state = self.state.read().await;
        let ratings: Vec<i16> = state
            .reviews
            .values()
            .filter(|r| r.tour_id == tour_id)
            .map(|r| r.rating)
            .collect();
        Ok(RatingStats::from_ratings(&ratings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Jonas".to_string(),
            email: email.to_string(),
            photo: None,
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_unique_violation() {
        let store = MemoryStore::new();
        store.create_user(&new_user("a@example.com"), "h").await.unwrap();

        let err = store
            .create_user(&new_user("a@example.com"), "h")
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_active_scope_hides_deactivated_users() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("b@example.com"), "h").await.unwrap();
        store.set_active(user.id, false).await.unwrap();

        assert!(
            UserRepository::find_by_id(&store, user.id, UserScope::Active)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            UserRepository::find_by_id(&store, user.id, UserScope::All)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_duplicate_review_pair_is_unique_violation() {
        let store = MemoryStore::new();
        let review = NewReview::new(1, 1, 5, "great").unwrap();
        store.create_review(&review).await.unwrap();

        let err = store.create_review(&review).await.unwrap_err();
        assert!(err.is_unique_violation());

        let other_tour = NewReview::new(2, 1, 5, "great").unwrap();
        assert!(store.create_review(&other_tour).await.is_ok());
    }

    #[tokio::test]
    async fn test_rating_stats_groups_by_tour() {
        let store = MemoryStore::new();
        for (tour, user, rating) in [(1, 1, 4), (1, 2, 5), (2, 1, 1)] {
            store
                .create_review(&NewReview::new(tour, user, rating, "ok").unwrap())
                .await
                .unwrap();
        }

        let stats = store.rating_stats(1).await.unwrap().unwrap();
        assert_eq!(stats.count, 2);
        assert!((stats.mean - 4.5).abs() < f64::EPSILON);
        assert!(store.rating_stats(3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_user_removes_their_reviews() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("c@example.com"), "h").await.unwrap();
        store
            .create_review(&NewReview::new(1, user.id, 4, "ok").unwrap())
            .await
            .unwrap();
        store
            .create_review(&NewReview::new(1, user.id + 1, 2, "meh").unwrap())
            .await
            .unwrap();

        assert!(store.delete_user(user.id).await.unwrap());
        assert!(!store.delete_user(user.id).await.unwrap());
        let left = store.list_for_tour(1).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].rating, 2);
    }

    #[tokio::test]
    async fn test_find_many_applies_scope() {
        let store = MemoryStore::new();
        let a = store.create_user(&new_user("d@example.com"), "h").await.unwrap();
        let b = store.create_user(&new_user("e@example.com"), "h").await.unwrap();
        store.set_active(b.id, false).await.unwrap();

        let active = store.find_many(&[a.id, b.id, 99], UserScope::Active).await.unwrap();
        assert_eq!(active.iter().map(|u| u.id).collect::<Vec<_>>(), vec![a.id]);
        assert_eq!(store.find_many(&[a.id, b.id], UserScope::All).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_redeem_reset_token_requires_matching_digest() {
        let store = MemoryStore::new();
        let user = store.create_user(&new_user("f@example.com"), "h").await.unwrap();
        let pending = Credential {
            password_reset_token_hash: Some("digest-1".to_string()),
            ..user.credential.clone()
        };
        store.update_credential(user.id, &pending).await.unwrap();

        let replaced = Credential::new("h2".to_string());
        assert!(!store.redeem_reset_token(user.id, "digest-2", &replaced).await.unwrap());
        assert!(store.redeem_reset_token(user.id, "digest-1", &replaced).await.unwrap());
        assert!(!store.redeem_reset_token(user.id, "digest-1", &replaced).await.unwrap());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let store = MemoryStore::new();
        store.fail_review_reads(true);
        assert!(matches!(
            store.rating_stats(1).await,
            Err(StoreError::Unavailable(_))
        ));

        store.fail_tour_writes(true);
        assert!(store.update_ratings(1, &RatingSummary::empty()).await.is_err());
        store.fail_tour_writes(false);
        assert!(!store.update_ratings(1, &RatingSummary::empty()).await.unwrap());
    }
}
