//! # Checkout Handler

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::auth::MaybeUser;
use crate::error::ApiResult;
use crate::services::{CheckoutReceipt, CheckoutRequest, CheckoutService};
use crate::state::AppState;

/// `POST /api/checkout`
///
/// Guests and signed-in customers alike. A signed-in order is linked to the
/// account so it shows up under `/api/account/orders`.
pub async fn place_order(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    body: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CheckoutReceipt>)> {
    let Json(request) = body?;

    let order = CheckoutService::new(state.db.clone(), state.delivery_policy())
        .place_order(&request, user.as_ref().map(|u| u.id.as_str()))
        .await?;

    Ok((StatusCode::CREATED, Json(CheckoutReceipt::from(&order))))
}
