//! # Checkout Service
//!
//! Prices carts, evaluates vouchers and places orders. Client-side totals
//! are never trusted: everything is recomputed from the live catalog.
//!
//! ## Placement Flow
//! ```text
//! CheckoutRequest
//!      │
//!      ▼
//! validate shipping + payment proof ──► 400 on bad input
//!      │
//!      ▼
//! merge_lines → get_many → price_lines → into_order_items ──► 404 / 422
//!      │
//!      ▼
//! delivery fee → voucher evaluation → OrderTotals::compute
//!      │
//!      ▼
//! OrderRepository::place_order  (one transaction: stock, voucher,
//!                                customer, order; retried on number clash)
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use stride_core::cart::{into_order_items, merge_lines, price_lines};
use stride_core::validation::{normalize_phone, validate_email, validate_optional_text, validate_text, validate_url};
use stride_core::voucher::{evaluate, normalize_code};
use stride_core::{
    AppliedVoucher, CartLineRequest, CartQuote, CoreError, DeliveryPolicy, Money, Order,
    OrderStatus, OrderTotals, PaymentMethod, PricedLine, VoucherRejection,
};
use stride_db::{Database, NewOrder, ShippingDetails};

use crate::error::ApiResult;

// =============================================================================
// Request / Response Types
// =============================================================================

/// Body of `POST /api/cart/quote`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    #[serde(default)]
    pub items: Vec<CartLineRequest>,
    pub voucher_code: Option<String>,
}

/// Body of `POST /api/checkout`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub items: Vec<CartLineRequest>,
    pub voucher_code: Option<String>,
}

/// What the buyer sees after a successful checkout.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReceipt {
    pub order_number: String,
    pub status: OrderStatus,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    pub voucher_code: Option<String>,
}

impl From<&Order> for CheckoutReceipt {
    fn from(order: &Order) -> Self {
        CheckoutReceipt {
            order_number: order.order_number.clone(),
            status: order.status,
            subtotal_cents: order.subtotal_cents,
            delivery_fee_cents: order.delivery_fee_cents,
            discount_cents: order.discount_cents,
            total_cents: order.total_cents,
            voucher_code: order.voucher_code.clone(),
        }
    }
}

// =============================================================================
// Service
// =============================================================================

/// Cart pricing and order placement.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    db: Database,
    delivery: DeliveryPolicy,
}

impl CheckoutService {
    pub fn new(db: Database, delivery: DeliveryPolicy) -> Self {
        CheckoutService { db, delivery }
    }

    /// Merges and prices lines against the live catalog.
    async fn price(&self, lines: &[CartLineRequest]) -> ApiResult<Vec<PricedLine>> {
        let merged = merge_lines(lines)?;
        let ids: Vec<String> = merged.iter().map(|l| l.product_id.clone()).collect();
        let catalog = self.db.products().get_many(&ids).await?;
        Ok(price_lines(&merged, &catalog))
    }

    /// Evaluates a voucher code against a subtotal. Read-only.
    pub async fn evaluate_voucher(
        &self,
        code: &str,
        subtotal: Money,
    ) -> ApiResult<Result<AppliedVoucher, VoucherRejection>> {
        let voucher = self.db.vouchers().get_by_code(code).await?;
        Ok(evaluate(voucher.as_ref(), subtotal, Utc::now()))
    }

    /// Prices a client-held cart.
    ///
    /// Unavailable lines are flagged, not rejected. Only malformed requests
    /// (non-positive or oversized quantities, too many lines) fail.
    pub async fn quote(&self, request: &QuoteRequest) -> ApiResult<CartQuote> {
        let lines = if request.items.is_empty() {
            Vec::new()
        } else {
            self.price(&request.items).await?
        };

        let voucher = match request.voucher_code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => {
                let subtotal = stride_core::cart::available_subtotal(&lines);
                let result = self.evaluate_voucher(&code, subtotal).await?;
                Some((code, result))
            }
            _ => None,
        };

        Ok(CartQuote::build(lines, &self.delivery, voucher))
    }

    /// Validates, prices and persists an order.
    pub async fn place_order(
        &self,
        request: &CheckoutRequest,
        user_id: Option<&str>,
    ) -> ApiResult<Order> {
        let shipping = validate_shipping(request)?;

        let payment_proof_url = match request.payment_proof_url.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(url) => Some(validate_url("paymentProofUrl", url)?),
        };
        if request.payment_method.requires_proof() && payment_proof_url.is_none() {
            return Err(CoreError::PaymentProofRequired.into());
        }

        let priced = self.price(&request.items).await?;
        let items = into_order_items(priced).map_err(|e| {
            warn!(phone = %shipping.phone, "Checkout refused: {}", e);
            e
        })?;

        let subtotal: Money = items.iter().map(|i| i.line_total()).sum();
        let delivery_fee = self.delivery.fee_for(subtotal);

        let voucher = match request.voucher_code.as_deref().map(normalize_code) {
            Some(code) if !code.is_empty() => {
                let applied = self.evaluate_voucher(&code, subtotal).await?.map_err(|rejection| {
                    warn!(code = %code, reason = rejection.kind(), "Voucher refused at checkout");
                    CoreError::VoucherRejected(rejection)
                })?;
                Some(applied)
            }
            _ => None,
        };

        let discount = voucher
            .as_ref()
            .map(AppliedVoucher::discount)
            .unwrap_or_default();
        let totals = OrderTotals::compute(subtotal, delivery_fee, discount);

        let order = self
            .db
            .orders()
            .place_order(&NewOrder {
                user_id: user_id.map(str::to_string),
                shipping,
                payment_method: request.payment_method,
                payment_proof_url,
                items,
                totals,
                voucher,
            })
            .await?;

        info!(
            order_number = %order.order_number,
            total = %totals.total,
            lines = order.items.len(),
            "Checkout completed"
        );

        Ok(order)
    }
}

/// Trims and bounds the shipping fields. The phone is reduced to digits.
fn validate_shipping(request: &CheckoutRequest) -> ApiResult<ShippingDetails> {
    let email = match request.email.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(email) => Some(validate_email(email)?),
    };

    Ok(ShippingDetails {
        customer_name: validate_text("customerName", &request.customer_name, 120)?,
        email,
        phone: normalize_phone(&request.phone)?,
        address: validate_text("address", &request.address, 500)?,
        city: validate_text("city", &request.city, 100)?,
        postal_code: validate_optional_text("postalCode", request.postal_code.as_deref(), 20)?,
        notes: validate_optional_text("notes", request.notes.as_deref(), 1000)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_core::types::tests_support::product;
    use stride_core::{DiscountType, Voucher};
    use stride_db::DbConfig;

    async fn setup() -> (Database, CheckoutService) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("p1", 1_000_000, 2)).await.unwrap();
        db.products().insert(&product("p2", 450_000, 1)).await.unwrap();

        let now = Utc::now();
        db.vouchers()
            .insert(&Voucher {
                id: "v1".to_string(),
                code: "STEP10".to_string(),
                description: None,
                discount_type: DiscountType::Percentage,
                value: 10,
                min_order_cents: 0,
                max_discount_cents: None,
                usage_limit: Some(1),
                used_count: 0,
                is_active: true,
                expires_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let service = CheckoutService::new(
            db.clone(),
            DeliveryPolicy::new(Money::from_cents(25_000), None),
        );
        (db, service)
    }

    fn line(id: &str, quantity: i64) -> CartLineRequest {
        CartLineRequest {
            product_id: id.to_string(),
            quantity,
        }
    }

    fn checkout(items: Vec<CartLineRequest>, voucher: Option<&str>) -> CheckoutRequest {
        CheckoutRequest {
            customer_name: "Ayesha Khan".to_string(),
            email: Some("ayesha@example.com".to_string()),
            phone: "0300-1234567".to_string(),
            address: "House 12, Street 4".to_string(),
            city: "Lahore".to_string(),
            postal_code: None,
            notes: None,
            payment_method: PaymentMethod::CashOnDelivery,
            payment_proof_url: None,
            items,
            voucher_code: voucher.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_quote_flags_bad_lines_without_failing() {
        let (_db, service) = setup().await;

        let quote = service
            .quote(&QuoteRequest {
                items: vec![line("p1", 1), line("p2", 3), line("ghost", 1)],
                voucher_code: Some("nope".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(quote.subtotal_cents, 1_000_000);
        assert_eq!(quote.delivery_fee_cents, 25_000);
        assert_eq!(quote.discount_cents, 0);
        assert_eq!(quote.total_cents, 1_025_000);
        assert!(!quote.can_checkout);
        assert!(matches!(
            quote.voucher,
            Some(stride_core::QuotedVoucher::Rejected { reason: VoucherRejection::NotFound, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_quote() {
        let (_db, service) = setup().await;

        let quote = service.quote(&QuoteRequest::default()).await.unwrap();
        assert_eq!(quote.total_cents, 0);
        assert!(!quote.can_checkout);
    }

    #[tokio::test]
    async fn test_place_order_computes_totals_server_side() {
        let (db, service) = setup().await;

        let order = service
            .place_order(&checkout(vec![line("p1", 1), line("p1", 1)], Some(" step10 ")), None)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal_cents, 2_000_000);
        assert_eq!(order.discount_cents, 200_000);
        assert_eq!(order.delivery_fee_cents, 25_000);
        assert_eq!(order.total_cents, 1_825_000);
        assert_eq!(order.voucher_code.as_deref(), Some("STEP10"));
        assert_eq!(order.phone, "03001234567");

        let p1 = db.products().get_by_id("p1").await.unwrap().unwrap();
        assert_eq!(p1.stock, 0);
    }

    #[tokio::test]
    async fn test_exhausted_voucher_refused() {
        let (_db, service) = setup().await;

        service
            .place_order(&checkout(vec![line("p1", 1)], Some("STEP10")), None)
            .await
            .unwrap();

        let err = service
            .place_order(&checkout(vec![line("p2", 1)], Some("STEP10")), None)
            .await
            .unwrap_err();
        assert_eq!(err.reason, Some("usage_exhausted"));
    }

    #[tokio::test]
    async fn test_bank_transfer_needs_proof() {
        let (_db, service) = setup().await;

        let mut request = checkout(vec![line("p1", 1)], None);
        request.payment_method = PaymentMethod::BankTransfer;
        let err = service.place_order(&request, None).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::ValidationError);

        request.payment_proof_url = Some("https://cdn.example.com/receipt.jpg".to_string());
        assert!(service.place_order(&request, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_insufficient_stock_rejected() {
        let (_db, service) = setup().await;

        let err = service
            .place_order(&checkout(vec![line("p2", 2)], None), None)
            .await
            .unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::InsufficientStock);
    }
}
