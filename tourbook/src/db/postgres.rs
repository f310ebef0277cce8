//! PostgreSQL implementations of the repository traits.
//!
//! Queries are built at runtime (no compile-time database access) and every call is
//! bounded by [`with_default_timeout`].

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use super::errors::StoreResult;
use super::repository::{ReviewRepository, TourRepository, TourScope, UserRepository, UserScope};
use super::timeouts::with_default_timeout;
use crate::auth::{Credential, NewUser, ProfileUpdate, Role, User, UserId};
use crate::reviews::{NewReview, RatingStats, Review, ReviewId, ReviewPatch};
use crate::tours::{Difficulty, NewTour, RatingSummary, Tour, TourId};

const USER_COLUMNS: &str = "id, name, email, photo, role, active, password_hash, \
     password_changed_at, password_reset_token_hash, password_reset_expires_at";

const TOUR_COLUMNS: &str = "id, name, slug, duration, max_group_size, difficulty, price, \
     price_discount, summary, description, image_cover, images, start_dates, guide_ids, \
     secret, ratings_quantity, ratings_average, created_at";

const REVIEW_COLUMNS: &str = "id, tour_id, user_id, rating, review, created_at";

fn decode_error(column: &str, reason: String) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: reason.into(),
    }
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let role: String = row.try_get("role")?;
    Ok(User {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        photo: row.try_get("photo")?,
        role: role.parse::<Role>().map_err(|e| decode_error("role", e))?,
        active: row.try_get("active")?,
        credential: Credential {
            password_hash: row.try_get("password_hash")?,
            password_changed_at: row.try_get("password_changed_at")?,
            password_reset_token_hash: row.try_get("password_reset_token_hash")?,
            password_reset_expires_at: row.try_get("password_reset_expires_at")?,
        },
    })
}

fn tour_from_row(row: &PgRow) -> StoreResult<Tour> {
    let difficulty: String = row.try_get("difficulty")?;
    Ok(Tour {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        duration: row.try_get("duration")?,
        max_group_size: row.try_get("max_group_size")?,
        difficulty: difficulty
            .parse::<Difficulty>()
            .map_err(|e| decode_error("difficulty", e))?,
        price: row.try_get("price")?,
        price_discount: row.try_get("price_discount")?,
        summary: row.try_get("summary")?,
        description: row.try_get("description")?,
        image_cover: row.try_get("image_cover")?,
        images: row.try_get("images")?,
        start_dates: row.try_get("start_dates")?,
        guide_ids: row.try_get("guide_ids")?,
        secret: row.try_get("secret")?,
        ratings: RatingSummary {
            quantity: row.try_get("ratings_quantity")?,
            average: row.try_get("ratings_average")?,
        },
        created_at: row.try_get("created_at")?,
    })
}

fn review_from_row(row: &PgRow) -> StoreResult<Review> {
    Ok(Review {
        id: row.try_get("id")?,
        tour_id: row.try_get("tour_id")?,
        user_id: row.try_get("user_id")?,
        rating: row.try_get("rating")?,
        text: row.try_get("review")?,
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL implementation of `UserRepository`
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create_user(&self, user: &NewUser, password_hash: &str) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (name, email, photo, role, password_hash)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&user.name)
                .bind(&user.email)
                .bind(&user.photo)
                .bind(user.role.as_str())
                .bind(password_hash)
                .fetch_one(&self.pool),
        )
        .await?;

        user_from_row(&row)
    }

    async fn find_by_id(&self, user_id: UserId, scope: UserScope) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND (active OR $2)");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .bind(scope == UserScope::All)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_many(&self, user_ids: &[UserId], scope: UserScope) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1) AND (active OR $2)");
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_ids)
                .bind(scope == UserScope::All)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn list_users(&self, scope: UserScope) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE active OR $1 ORDER BY id");
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(scope == UserScope::All)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    async fn find_by_email(&self, email: &str, scope: UserScope) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND (active OR $2)");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(email)
                .bind(scope == UserScope::All)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn find_by_reset_token_hash(
        &self,
        token_hash: &str,
        scope: UserScope,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users
             WHERE password_reset_token_hash = $1 AND (active OR $2)"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(token_hash)
                .bind(scope == UserScope::All)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn update_credential(
        &self,
        user_id: UserId,
        credential: &Credential,
    ) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query(
                r#"
                UPDATE users
                SET password_hash = $2,
                    password_changed_at = $3,
                    password_reset_token_hash = $4,
                    password_reset_expires_at = $5
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .bind(&credential.password_hash)
            .bind(credential.password_changed_at)
            .bind(&credential.password_reset_token_hash)
            .bind(credential.password_reset_expires_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn redeem_reset_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        credential: &Credential,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                r#"
                UPDATE users
                SET password_hash = $2,
                    password_changed_at = $3,
                    password_reset_token_hash = $4,
                    password_reset_expires_at = $5
                WHERE id = $1 AND password_reset_token_hash = $6
                "#,
            )
            .bind(user_id)
            .bind(&credential.password_hash)
            .bind(credential.password_changed_at)
            .bind(&credential.password_reset_token_hash)
            .bind(credential.password_reset_expires_at)
            .bind(token_hash)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users
             SET name = COALESCE($2, name),
                 email = COALESCE($3, email),
                 role = COALESCE($4, role)
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(user_id)
                .bind(&update.name)
                .bind(&update.email)
                .bind(update.role.map(|role| role.as_str()))
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_active(&self, user_id: UserId, active: bool) -> StoreResult<()> {
        with_default_timeout(
            sqlx::query("UPDATE users SET active = $2 WHERE id = $1")
                .bind(user_id)
                .bind(active)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn delete_user(&self, user_id: UserId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL implementation of `TourRepository`
#[derive(Clone)]
pub struct PgTourRepository {
    pool: PgPool,
}

impl PgTourRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TourRepository for PgTourRepository {
    async fn create_tour(&self, tour: &NewTour) -> StoreResult<Tour> {
        let draft = tour.draft();
        let sql = format!(
            "INSERT INTO tours (name, slug, duration, max_group_size, difficulty, price,
                                price_discount, summary, description, image_cover, images,
                                start_dates, guide_ids, secret)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
             RETURNING {TOUR_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(&draft.name)
                .bind(tour.slug())
                .bind(draft.duration)
                .bind(draft.max_group_size)
                .bind(draft.difficulty.as_str())
                .bind(draft.price)
                .bind(draft.price_discount)
                .bind(&draft.summary)
                .bind(&draft.description)
                .bind(&draft.image_cover)
                .bind(&draft.images)
                .bind(&draft.start_dates)
                .bind(&draft.guide_ids)
                .bind(draft.secret)
                .fetch_one(&self.pool),
        )
        .await?;

        tour_from_row(&row)
    }

    async fn find_by_id(&self, tour_id: TourId, scope: TourScope) -> StoreResult<Option<Tour>> {
        let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE id = $1 AND (NOT secret OR $2)");
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tour_id)
                .bind(scope == TourScope::All)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(tour_from_row).transpose()
    }

    async fn list(&self, scope: TourScope) -> StoreResult<Vec<Tour>> {
        let sql = format!("SELECT {TOUR_COLUMNS} FROM tours WHERE NOT secret OR $1 ORDER BY id");
        let rows = with_default_timeout(
            sqlx::query(&sql)
                .bind(scope == TourScope::All)
                .fetch_all(&self.pool),
        )
        .await?;

        rows.iter().map(tour_from_row).collect()
    }

    async fn update_tour(&self, tour_id: TourId, tour: &NewTour) -> StoreResult<Option<Tour>> {
        let draft = tour.draft();
        let sql = format!(
            "UPDATE tours
             SET name = $2, slug = $3, duration = $4, max_group_size = $5, difficulty = $6,
                 price = $7, price_discount = $8, summary = $9, description = $10,
                 image_cover = $11, images = $12, start_dates = $13, guide_ids = $14,
                 secret = $15
             WHERE id = $1
             RETURNING {TOUR_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(tour_id)
                .bind(&draft.name)
                .bind(tour.slug())
                .bind(draft.duration)
                .bind(draft.max_group_size)
                .bind(draft.difficulty.as_str())
                .bind(draft.price)
                .bind(draft.price_discount)
                .bind(&draft.summary)
                .bind(&draft.description)
                .bind(&draft.image_cover)
                .bind(&draft.images)
                .bind(&draft.start_dates)
                .bind(&draft.guide_ids)
                .bind(draft.secret)
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(tour_from_row).transpose()
    }

    async fn delete_tour(&self, tour_id: TourId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM tours WHERE id = $1")
                .bind(tour_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_ratings(
        &self,
        tour_id: TourId,
        summary: &RatingSummary,
    ) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query(
                "UPDATE tours SET ratings_quantity = $2, ratings_average = $3 WHERE id = $1",
            )
            .bind(tour_id)
            .bind(summary.quantity)
            .bind(summary.average)
            .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// PostgreSQL implementation of `ReviewRepository`
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    async fn create_review(&self, review: &NewReview) -> StoreResult<Review> {
        let sql = format!(
            "INSERT INTO reviews (tour_id, user_id, rating, review)
             VALUES ($1, $2, $3, $4)
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(review.tour_id())
                .bind(review.user_id())
                .bind(review.rating())
                .bind(review.text())
                .fetch_one(&self.pool),
        )
        .await?;

        review_from_row(&row)
    }

    async fn find_by_id(&self, review_id: ReviewId) -> StoreResult<Option<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let row = with_default_timeout(
            sqlx::query(&sql).bind(review_id).fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    async fn list_for_tour(&self, tour_id: TourId) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE tour_id = $1 ORDER BY id");
        let rows = with_default_timeout(sqlx::query(&sql).bind(tour_id).fetch_all(&self.pool))
            .await?;

        rows.iter().map(review_from_row).collect()
    }

    async fn list_all(&self) -> StoreResult<Vec<Review>> {
        let sql = format!("SELECT {REVIEW_COLUMNS} FROM reviews ORDER BY id");
        let rows = with_default_timeout(sqlx::query(&sql).fetch_all(&self.pool)).await?;

        rows.iter().map(review_from_row).collect()
    }

    async fn update_review(
        &self,
        review_id: ReviewId,
        patch: &ReviewPatch,
    ) -> StoreResult<Option<Review>> {
        let sql = format!(
            "UPDATE reviews
             SET rating = COALESCE($2, rating), review = COALESCE($3, review)
             WHERE id = $1
             RETURNING {REVIEW_COLUMNS}"
        );
        let row = with_default_timeout(
            sqlx::query(&sql)
                .bind(review_id)
                .bind(patch.rating())
                .bind(patch.text())
                .fetch_optional(&self.pool),
        )
        .await?;

        row.as_ref().map(review_from_row).transpose()
    }

    async fn delete_review(&self, review_id: ReviewId) -> StoreResult<bool> {
        let result = with_default_timeout(
            sqlx::query("DELETE FROM reviews WHERE id = $1")
                .bind(review_id)
                .execute(&self.pool),
        )
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn rating_stats(&self, tour_id: TourId) -> StoreResult<Option<RatingStats>> {
        let row = with_default_timeout(
            sqlx::query(
                r#"
                SELECT COUNT(*) AS n_rating, AVG(rating)::DOUBLE PRECISION AS avg_rating
                FROM reviews
                WHERE tour_id = $1
                "#,
            )
            .bind(tour_id)
            .fetch_one(&self.pool),
        )
        .await?;

        let count: i64 = row.try_get("n_rating")?;
        let mean: Option<f64> = row.try_get("avg_rating")?;
        Ok(mean
            .filter(|_| count > 0)
            .map(|mean| RatingStats { count, mean }))
    }
}
