//! Guest customer records and registered accounts.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use stride_core::{Customer, User};
use stride_db::Page;

use crate::auth::AdminUser;
use crate::error::ApiResult;
use crate::handlers::Paging;
use crate::state::AppState;

/// `GET /api/admin/customers`
pub async fn list_customers(
    _admin: AdminUser,
    State(state): State<AppState>,
    paging: Result<Query<Paging>, QueryRejection>,
) -> ApiResult<Json<Page<Customer>>> {
    let Query(paging) = paging?;
    Ok(Json(state.db.customers().list(paging.request()).await?))
}

/// `GET /api/admin/users`
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
    paging: Result<Query<Paging>, QueryRejection>,
) -> ApiResult<Json<Page<User>>> {
    let Query(paging) = paging?;
    Ok(Json(state.db.users().list(paging.request()).await?))
}
