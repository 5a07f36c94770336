//! # Order Management
//!
//! Listing, detail, status changes and tracking details. Status changes
//! follow the order lifecycle; an illegal move is a 409.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::info;

use stride_core::validation::{validate_optional_text, validate_search_query};
use stride_core::{CoreError, Order, OrderStatus};
use stride_db::{OrderFilter, Page, PageRequest};

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingUpdate {
    pub tracking_number: Option<String>,
    pub courier: Option<String>,
}

/// `GET /api/admin/orders`
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<AdminOrderQuery>, QueryRejection>,
) -> ApiResult<Json<Page<Order>>> {
    let Query(query) = query?;
    let search = match query.q.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(q) => Some(validate_search_query(q)?),
    };

    let filter = OrderFilter {
        status: query.status,
        query: search,
    };
    let page = PageRequest::new(query.page, query.per_page, 20, 100);

    Ok(Json(state.db.orders().list(&filter, page).await?))
}

/// `GET /api/admin/orders/{order_number}`
pub async fn get(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state
        .db
        .orders()
        .get_by_number(&order_number)
        .await?
        .ok_or_else(|| CoreError::OrderNotFound(order_number.clone()))?;

    Ok(Json(order))
}

/// `PATCH /api/admin/orders/{order_number}/status`
pub async fn update_status(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let Json(update) = body?;

    let order = state
        .db
        .orders()
        .update_status(&order_number, update.status)
        .await?;

    info!(admin_id = %admin.id, order_number = %order.order_number, status = %order.status, "Order status set");
    Ok(Json(order))
}

/// `PATCH /api/admin/orders/{order_number}/tracking`
///
/// Independent of status. Blank values clear the field.
pub async fn update_tracking(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(order_number): Path<String>,
    body: Result<Json<TrackingUpdate>, JsonRejection>,
) -> ApiResult<Json<Order>> {
    let Json(update) = body?;
    let tracking_number =
        validate_optional_text("trackingNumber", update.tracking_number.as_deref(), 100)?;
    let courier = validate_optional_text("courier", update.courier.as_deref(), 100)?;

    let order = state
        .db
        .orders()
        .update_tracking(&order_number, tracking_number.as_deref(), courier.as_deref())
        .await?;

    info!(admin_id = %admin.id, order_number = %order.order_number, "Tracking updated");
    Ok(Json(order))
}
