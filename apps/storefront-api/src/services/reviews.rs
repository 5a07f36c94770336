//! # Review Service
//!
//! Purchase-verified reviews. A customer may review a product only from one
//! of their own delivered orders that contains it, once per order line.
//! New reviews wait for moderation.

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use stride_core::validation::{validate_optional_text, validate_rating};
use stride_core::{CoreError, OrderStatus, Review};
use stride_db::Database;

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};

/// Body of `POST /api/reviews`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub order_number: String,
    pub product_id: String,
    pub rating: i64,
    pub comment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        ReviewService { db }
    }

    /// Stores an unapproved review after the purchase check.
    pub async fn submit(&self, user: &CurrentUser, request: &ReviewRequest) -> ApiResult<Review> {
        validate_rating(request.rating)?;
        let comment = validate_optional_text("comment", request.comment.as_deref(), 2000)?;

        let account = self
            .db
            .users()
            .get_by_id(&user.id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

        // Someone else's order reads as missing.
        let order = self
            .db
            .orders()
            .get_by_number(&request.order_number)
            .await?
            .filter(|o| o.user_id.as_deref() == Some(account.id.as_str()))
            .ok_or_else(|| CoreError::OrderNotFound(request.order_number.clone()))?;

        let refusal = if order.status != OrderStatus::Delivered {
            Some("the order has not been delivered yet")
        } else if !order.contains_product(&request.product_id) {
            Some("the order does not contain this product")
        } else {
            None
        };

        if let Some(reason) = refusal {
            warn!(user_id = %account.id, order_number = %order.order_number, reason, "Review refused");
            return Err(CoreError::ReviewNotAllowed {
                reason: reason.to_string(),
            }
            .into());
        }

        let review = Review {
            id: Uuid::new_v4().to_string(),
            product_id: request.product_id.clone(),
            user_id: account.id.clone(),
            order_id: order.id.clone(),
            author_name: account.name.clone(),
            rating: request.rating,
            comment,
            is_approved: false,
            created_at: Utc::now(),
        };

        self.db.reviews().insert(&review).await?;
        info!(review_id = %review.id, product_id = %review.product_id, "Review submitted");

        Ok(review)
    }
}
