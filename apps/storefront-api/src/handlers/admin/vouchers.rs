//! # Voucher Management
//!
//! `used_count` is owned by checkout and never set from here.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use stride_core::validation::{
    validate_optional_text, validate_percentage, validate_price_cents, validate_voucher_code,
};
use stride_core::{DiscountType, ValidationError, Voucher};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create / replace payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherInput {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    /// Whole percent for `percentage`, minor units for `fixed`.
    pub value: i64,
    #[serde(default)]
    pub min_order_cents: i64,
    pub max_discount_cents: Option<i64>,
    pub usage_limit: Option<i64>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

impl VoucherInput {
    /// Checks the input and copies it onto `voucher`.
    fn apply(&self, voucher: &mut Voucher) -> ApiResult<()> {
        let code = validate_voucher_code(&self.code)?;
        let description = validate_optional_text("description", self.description.as_deref(), 500)?;

        match self.discount_type {
            DiscountType::Percentage => validate_percentage(self.value)?,
            DiscountType::Fixed => {
                validate_price_cents("value", self.value)?;
                if self.value == 0 {
                    return Err(ValidationError::MustBePositive {
                        field: "value".to_string(),
                    }
                    .into());
                }
            }
        }

        validate_price_cents("minOrderCents", self.min_order_cents)?;
        if let Some(cap) = self.max_discount_cents {
            validate_price_cents("maxDiscountCents", cap)?;
        }
        if self.usage_limit.is_some_and(|limit| limit < 1) {
            return Err(ValidationError::MustBePositive {
                field: "usageLimit".to_string(),
            }
            .into());
        }

        voucher.code = code;
        voucher.description = description;
        voucher.discount_type = self.discount_type;
        voucher.value = self.value;
        voucher.min_order_cents = self.min_order_cents;
        voucher.max_discount_cents = self.max_discount_cents;
        voucher.usage_limit = self.usage_limit;
        voucher.is_active = self.is_active;
        voucher.expires_at = self.expires_at;
        Ok(())
    }
}

/// `GET /api/admin/vouchers`
pub async fn list(_admin: AdminUser, State(state): State<AppState>) -> ApiResult<Json<Vec<Voucher>>> {
    Ok(Json(state.db.vouchers().list().await?))
}

/// `POST /api/admin/vouchers`
pub async fn create(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    body: Result<Json<VoucherInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Voucher>)> {
    let Json(input) = body?;

    let now = Utc::now();
    let mut voucher = Voucher {
        id: Uuid::new_v4().to_string(),
        code: String::new(),
        description: None,
        discount_type: input.discount_type,
        value: 0,
        min_order_cents: 0,
        max_discount_cents: None,
        usage_limit: None,
        used_count: 0,
        is_active: true,
        expires_at: None,
        created_at: now,
        updated_at: now,
    };
    input.apply(&mut voucher)?;

    state.db.vouchers().insert(&voucher).await?;
    info!(admin_id = %admin.id, code = %voucher.code, "Voucher created");

    Ok((StatusCode::CREATED, Json(voucher)))
}

/// `PUT /api/admin/vouchers/{id}`
pub async fn update(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<VoucherInput>, JsonRejection>,
) -> ApiResult<Json<Voucher>> {
    let Json(input) = body?;

    let mut voucher = state
        .db
        .vouchers()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Voucher", &id))?;
    input.apply(&mut voucher)?;

    let voucher = state.db.vouchers().update(&voucher).await?;
    info!(admin_id = %admin.id, code = %voucher.code, "Voucher updated");

    Ok(Json(voucher))
}

/// `DELETE /api/admin/vouchers/{id}`
pub async fn delete(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.vouchers().delete(&id).await?;
    info!(admin_id = %admin.id, voucher_id = %id, "Voucher deleted");
    Ok(StatusCode::NO_CONTENT)
}
