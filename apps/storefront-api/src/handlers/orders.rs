//! # Order Tracking Handler
//!
//! Guests look an order up by number and the phone used at checkout. Any
//! mismatch is a plain 404 so order numbers cannot be enumerated.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use stride_core::validation::normalize_phone;
use stride_core::{CoreError, Order};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuery {
    pub order_number: String,
    pub phone: String,
}

/// `GET /api/orders/track?orderNumber=&phone=`
pub async fn track(
    State(state): State<AppState>,
    query: Result<Query<TrackQuery>, QueryRejection>,
) -> ApiResult<Json<Order>> {
    let Query(query) = query?;
    let not_found = || CoreError::OrderNotFound(query.order_number.trim().to_uppercase());

    let Ok(phone) = normalize_phone(&query.phone) else {
        return Err(not_found().into());
    };

    let order = state
        .db
        .orders()
        .get_by_number(&query.order_number)
        .await?
        .filter(|order| order.phone == phone)
        .ok_or_else(not_found)?;

    debug!(order_number = %order.order_number, "Order tracked");
    Ok(Json(order))
}
