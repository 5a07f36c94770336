//! # Account Handlers
//!
//! Everything here needs a signed-in customer (admins are customers too).

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use stride_core::validation::{normalize_phone, validate_text};
use stride_core::{CoreError, Order, Review, User};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult};
use crate::services::{ReviewRequest, ReviewService};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone: Option<String>,
}

/// `GET /api/account/me`
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<User>> {
    let account = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    Ok(Json(account))
}

/// `PUT /api/account/me`
pub async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(request) = body?;

    let name = validate_text("name", &request.name, 120)?;
    let phone = match request.phone.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(phone) => Some(normalize_phone(phone)?),
    };

    let account = state
        .db
        .users()
        .update_profile(&user.id, &name, phone.as_deref())
        .await?;

    info!(user_id = %account.id, "Profile updated");
    Ok(Json(account))
}

/// `GET /api/account/orders`
pub async fn my_orders(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.db.orders().list_for_user(&user.id).await?))
}

/// `GET /api/account/orders/{order_number}`
///
/// Another account's order is reported as not found.
pub async fn my_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .orders()
        .get_by_number(&order_number)
        .await?
        .filter(|o| o.user_id.as_deref() == Some(user.id.as_str()))
        .ok_or_else(|| CoreError::OrderNotFound(order_number.clone()))?;

    Ok(Json(order))
}

/// `POST /api/reviews`
pub async fn submit_review(
    State(state): State<AppState>,
    user: CurrentUser,
    body: Result<Json<ReviewRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    let Json(request) = body?;

    let review = ReviewService::new(state.db.clone())
        .submit(&user, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}
