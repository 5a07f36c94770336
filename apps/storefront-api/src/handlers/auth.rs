//! # Session Handlers
//!
//! Register, login and refresh. All three answer with a fresh token pair.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use stride_core::validation::{normalize_phone, validate_email, validate_password, validate_text};
use stride_core::{User, UserRole};

use crate::auth::{hash_password, verify_password, TokenPair};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens plus the account they belong to.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let Json(request) = body?;

    let email = validate_email(&request.email)?;
    validate_password(&request.password)?;
    let name = validate_text("name", &request.name, 120)?;
    let phone = match request.phone.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(phone) => Some(normalize_phone(phone)?),
    };

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        password_hash: hash_password(&request.password)?,
        name,
        phone,
        role: UserRole::Customer,
        created_at: now,
        updated_at: now,
    };

    state.db.users().insert(&user).await?;
    info!(user_id = %user.id, "Account registered");

    let tokens = state.jwt.issue_pair(&user)?;
    Ok((StatusCode::CREATED, Json(SessionResponse { tokens, user })))
}

/// `POST /api/auth/login`
///
/// Unknown email and wrong password give the same answer.
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(request) = body?;
    let invalid = || ApiError::unauthorized("Invalid email or password");

    let user = state
        .db
        .users()
        .get_by_email(&request.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&user.password_hash, &request.password)? {
        warn!(user_id = %user.id, "Failed login");
        return Err(invalid());
    }

    info!(user_id = %user.id, role = user.role.as_str(), "Signed in");
    let tokens = state.jwt.issue_pair(&user)?;
    Ok(Json(SessionResponse { tokens, user }))
}

/// `POST /api/auth/refresh`
///
/// The role is re-read from the database so a promotion or demotion takes
/// effect on the next refresh.
pub async fn refresh(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<SessionResponse>> {
    let Json(request) = body?;

    let claims = state.jwt.validate_refresh_token(&request.refresh_token)?;
    let user = state
        .db
        .users()
        .get_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;

    let tokens = state.jwt.issue_pair(&user)?;
    Ok(Json(SessionResponse { tokens, user }))
}
