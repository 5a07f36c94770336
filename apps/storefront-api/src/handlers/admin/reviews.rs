//! Review moderation: list, approve / hide, delete.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use stride_core::Review;
use stride_db::{Page, PageRequest};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminReviewQuery {
    /// `true` approved only, `false` pending only, absent for all.
    pub approved: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModerationUpdate {
    pub is_approved: bool,
}

/// `GET /api/admin/reviews`
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<AdminReviewQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Review>>> {
    let Query(query) = query?;
    let page = PageRequest::new(query.page, query.per_page, 20, 100);
    Ok(Json(state.db.reviews().list(query.approved, page).await?))
}

/// `PATCH /api/admin/reviews/{id}`
pub async fn moderate(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ModerationUpdate>, JsonRejection>,
) -> ApiResult<Json<Review>> {
    let Json(update) = body?;

    let review = state.db.reviews().set_approved(&id, update.is_approved).await?;
    info!(admin_id = %admin.id, review_id = %id, approved = update.is_approved, "Review moderated");

    Ok(Json(review))
}

/// `DELETE /api/admin/reviews/{id}`
pub async fn delete(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.reviews().delete(&id).await?;
    info!(admin_id = %admin.id, review_id = %id, "Review deleted");
    Ok(StatusCode::NO_CONTENT)
}
