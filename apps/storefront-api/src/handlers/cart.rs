//! # Cart Handlers
//!
//! The cart lives in the browser; these endpoints only price it.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use tracing::debug;

use stride_core::validation::validate_voucher_code;
use stride_core::{AppliedVoucher, CartQuote, CoreError, Money};

use crate::error::{ApiError, ApiResult};
use crate::services::{CheckoutService, QuoteRequest};
use crate::state::AppState;

/// `POST /api/cart/quote`
pub async fn quote(
    State(state): State<AppState>,
    body: Result<Json<QuoteRequest>, JsonRejection>,
) -> ApiResult<Json<CartQuote>> {
    let Json(request) = body?;

    let quote = CheckoutService::new(state.db.clone(), state.delivery_policy())
        .quote(&request)
        .await?;

    debug!(
        lines = quote.lines.len(),
        total = quote.total_cents,
        can_checkout = quote.can_checkout,
        "Cart quoted"
    );
    Ok(Json(quote))
}

/// Body of `POST /api/vouchers/apply`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyVoucherRequest {
    pub code: String,
    pub subtotal_cents: i64,
}

/// `POST /api/vouchers/apply`
///
/// Read-only check of a code against a subtotal. A refused code is a 422
/// with `reason` set to the rejection kind.
pub async fn apply_voucher(
    State(state): State<AppState>,
    body: Result<Json<ApplyVoucherRequest>, JsonRejection>,
) -> ApiResult<Json<AppliedVoucher>> {
    let Json(request) = body?;
    let code = validate_voucher_code(&request.code)?;
    if request.subtotal_cents < 0 {
        return Err(ApiError::validation("subtotalCents must not be negative"));
    }

    let applied = CheckoutService::new(state.db.clone(), state.delivery_policy())
        .evaluate_voucher(&code, Money::from_cents(request.subtotal_cents))
        .await?
        .map_err(CoreError::VoucherRejected)?;

    Ok(Json(applied))
}
