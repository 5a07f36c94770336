//! # Review Repository
//!
//! Review storage and moderation. The purchase check (delivered order of
//! the same user containing the product) happens before `insert`; the
//! `UNIQUE (order_id, product_id)` index stops duplicates.

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{Page, PageRequest};
use stride_core::Review;

const REVIEW_COLUMNS: &str =
    "id, product_id, user_id, order_id, author_name, rating, comment, is_approved, created_at";

/// Average rating over approved reviews.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    /// `None` when nothing is approved yet.
    pub average: Option<f64>,
    pub count: i64,
}

/// Repository for review database operations.
#[derive(Debug, Clone)]
pub struct ReviewRepository {
    pool: SqlitePool,
}

impl ReviewRepository {
    /// Creates a new ReviewRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReviewRepository { pool }
    }

    /// Inserts a review.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when this order line was reviewed already.
    pub async fn insert(&self, review: &Review) -> DbResult<()> {
        debug!(product_id = %review.product_id, order_id = %review.order_id, "Inserting review");

        sqlx::query(
            r#"
            INSERT INTO reviews (
                id, product_id, user_id, order_id, author_name, rating, comment, is_approved, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&review.id)
        .bind(&review.product_id)
        .bind(&review.user_id)
        .bind(&review.order_id)
        .bind(&review.author_name)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.is_approved)
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Approved reviews of a product, newest first.
    pub async fn list_approved_for_product(&self, product_id: &str) -> DbResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE product_id = ?1 AND is_approved = 1 \
             ORDER BY created_at DESC, id",
            REVIEW_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Average rating and count of approved reviews.
    pub async fn rating_summary(&self, product_id: &str) -> DbResult<RatingSummary> {
        let (average, count): (Option<f64>, i64) = sqlx::query_as(
            "SELECT AVG(rating), COUNT(*) FROM reviews WHERE product_id = ?1 AND is_approved = 1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(RatingSummary { average, count })
    }

    /// Moderation queue. `approved = None` lists everything.
    pub async fn list(&self, approved: Option<bool>, page: PageRequest) -> DbResult<Page<Review>> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reviews WHERE (?1 IS NULL OR is_approved = ?1)",
        )
        .bind(approved)
        .fetch_one(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE (?1 IS NULL OR is_approved = ?1) \
             ORDER BY created_at DESC, id LIMIT ?2 OFFSET ?3",
            REVIEW_COLUMNS
        ))
        .bind(approved)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }

    /// Approves or hides a review.
    pub async fn set_approved(&self, id: &str, approved: bool) -> DbResult<Review> {
        let result = sqlx::query("UPDATE reviews SET is_approved = ?2 WHERE id = ?1")
            .bind(id)
            .bind(approved)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Review", id));
        }

        let review = sqlx::query_as::<_, Review>(&format!(
            "SELECT {} FROM reviews WHERE id = ?1",
            REVIEW_COLUMNS
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(review)
    }

    /// Deletes a review.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Review", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
