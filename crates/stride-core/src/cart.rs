//! # Cart Pricing
//!
//! The cart lives on the client as `(product_id, quantity)` pairs. The
//! server re-prices it against the live catalog every time, for the quote
//! endpoint and again at checkout.
//!
//! ## Two Modes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  merge_lines(raw)          dedupe + caps (50 lines, 10 per line)       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  price_lines(lines, catalog)                                           │
//! │       │                                                                 │
//! │       ├──► CartQuote  (lenient)  bad lines flagged, never fails         │
//! │       │                                                                 │
//! │       └──► into_order_items (strict)  any bad line aborts checkout      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::order::{OrderItem, OrderTotals};
use crate::types::Product;
use crate::voucher::{AppliedVoucher, VoucherRejection};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

// =============================================================================
// Request Lines
// =============================================================================

/// One line of the client-held cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLineRequest {
    pub product_id: String,
    pub quantity: i64,
}

/// Validates quantities and merges duplicate products, keeping first-seen
/// order.
///
/// ## Rules
/// - Every quantity must be 1..=10 (after merging too)
/// - At most 50 distinct products
/// - An empty cart is [`CoreError::EmptyCart`]
pub fn merge_lines(lines: &[CartLineRequest]) -> CoreResult<Vec<CartLineRequest>> {
    if lines.is_empty() {
        return Err(CoreError::EmptyCart);
    }

    let mut merged: Vec<CartLineRequest> = Vec::with_capacity(lines.len());
    for line in lines {
        let product_id = line.product_id.trim();
        if product_id.is_empty() {
            return Err(ValidationError::required("productId").into());
        }
        if line.quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        match merged.iter_mut().find(|m| m.product_id == product_id) {
            Some(existing) => existing.quantity += line.quantity,
            None => merged.push(CartLineRequest {
                product_id: product_id.to_string(),
                quantity: line.quantity,
            }),
        }
    }

    if merged.len() > MAX_CART_LINES {
        return Err(CoreError::CartTooLarge {
            max: MAX_CART_LINES,
        });
    }

    if let Some(line) = merged.iter().find(|l| l.quantity > MAX_LINE_QUANTITY) {
        return Err(CoreError::QuantityTooLarge {
            requested: line.quantity,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(merged)
}

// =============================================================================
// Priced Lines
// =============================================================================

/// Whether a line can be bought as requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "status", rename_all = "snake_case")]
#[ts(export)]
pub enum LineAvailability {
    Available,
    /// No product with that id.
    Missing,
    /// Product exists but is hidden from the storefront.
    Hidden,
    /// Fewer pairs on hand than requested.
    InsufficientStock { available: i64 },
}

impl LineAvailability {
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, LineAvailability::Available)
    }
}

/// A cart line priced against the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PricedLine {
    pub product_id: String,
    pub quantity: i64,
    /// Catalog snapshot; `None` when the product is missing.
    pub product: Option<Product>,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub availability: LineAvailability,
}

impl PricedLine {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

/// Prices merged lines against `catalog` (products keyed by id).
pub fn price_lines(
    lines: &[CartLineRequest],
    catalog: &HashMap<String, Product>,
) -> Vec<PricedLine> {
    lines
        .iter()
        .map(|line| {
            let product = catalog.get(&line.product_id);
            let availability = match product {
                None => LineAvailability::Missing,
                Some(p) if !p.is_visible => LineAvailability::Hidden,
                Some(p) if p.stock < line.quantity => LineAvailability::InsufficientStock {
                    available: p.stock.max(0),
                },
                Some(_) => LineAvailability::Available,
            };
            let unit_price = product.map(Product::price).unwrap_or_default();

            PricedLine {
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                product: product.cloned(),
                unit_price_cents: unit_price.cents(),
                line_total_cents: unit_price.multiply_quantity(line.quantity).cents(),
                availability,
            }
        })
        .collect()
}

/// Subtotal over available lines only.
pub fn available_subtotal(lines: &[PricedLine]) -> Money {
    lines
        .iter()
        .filter(|l| l.availability.is_available())
        .map(PricedLine::line_total)
        .sum()
}

/// Strict conversion used by checkout: the first unavailable line aborts.
pub fn into_order_items(lines: Vec<PricedLine>) -> CoreResult<Vec<OrderItem>> {
    lines
        .into_iter()
        .map(|line| {
            let product = match (line.availability, line.product) {
                (LineAvailability::Missing, _) | (_, None) => {
                    return Err(CoreError::ProductNotFound(line.product_id))
                }
                (LineAvailability::Hidden, Some(p)) => {
                    return Err(CoreError::ProductUnavailable { name: p.name })
                }
                (LineAvailability::InsufficientStock { available }, Some(p)) => {
                    return Err(CoreError::InsufficientStock {
                        name: p.name,
                        available,
                        requested: line.quantity,
                    })
                }
                (LineAvailability::Available, Some(p)) => p,
            };

            Ok(OrderItem {
                image: product.cover_image().map(str::to_string),
                product_id: product.id,
                slug: product.slug,
                name: product.name,
                brand: product.brand,
                size: product.size,
                condition_score: product.condition_score,
                unit_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                line_total_cents: line.line_total_cents,
            })
        })
        .collect()
}

// =============================================================================
// Delivery
// =============================================================================

/// Flat delivery fee, optionally waived above a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryPolicy {
    pub flat_fee: Money,
    pub free_threshold: Option<Money>,
}

impl DeliveryPolicy {
    pub fn new(flat_fee: Money, free_threshold: Option<Money>) -> Self {
        Self {
            flat_fee,
            free_threshold,
        }
    }

    /// Fee for a subtotal. Nothing to deliver means no fee.
    ///
    /// ## Example
    /// ```rust
    /// use stride_core::{DeliveryPolicy, Money};
    ///
    /// let policy = DeliveryPolicy::new(Money::from_cents(25_000), Some(Money::from_cents(1_500_000)));
    /// assert_eq!(policy.fee_for(Money::from_cents(1_000_000)).cents(), 25_000);
    /// assert_eq!(policy.fee_for(Money::from_cents(1_500_000)).cents(), 0);
    /// ```
    pub fn fee_for(&self, subtotal: Money) -> Money {
        if !subtotal.is_positive() {
            return Money::zero();
        }
        match self.free_threshold {
            Some(threshold) if subtotal >= threshold => Money::zero(),
            _ => self.flat_fee.non_negative(),
        }
    }
}

// =============================================================================
// Quote
// =============================================================================

/// Outcome of the voucher part of a quote.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "result")]
pub enum QuotedVoucher {
    Applied(AppliedVoucher),
    Rejected {
        code: String,
        reason: VoucherRejection,
        message: String,
    },
}

/// A priced cart, as shown on the cart page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartQuote {
    pub lines: Vec<PricedLine>,
    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// True when every line can be bought as requested.
    pub can_checkout: bool,
    pub voucher: Option<QuotedVoucher>,
}

impl CartQuote {
    /// Builds a quote from priced lines.
    ///
    /// `voucher` is the evaluation result for the code the client sent, if
    /// any; a rejected voucher contributes no discount.
    pub fn build(
        lines: Vec<PricedLine>,
        delivery: &DeliveryPolicy,
        voucher: Option<(String, Result<AppliedVoucher, VoucherRejection>)>,
    ) -> Self {
        let subtotal = available_subtotal(&lines);
        let fee = delivery.fee_for(subtotal);

        let (discount, voucher) = match voucher {
            None => (Money::zero(), None),
            Some((_, Ok(applied))) => (applied.discount(), Some(QuotedVoucher::Applied(applied))),
            Some((code, Err(reason))) => (
                Money::zero(),
                Some(QuotedVoucher::Rejected {
                    code,
                    message: reason.to_string(),
                    reason,
                }),
            ),
        };

        let totals = OrderTotals::compute(subtotal, fee, discount);
        let can_checkout =
            !lines.is_empty() && lines.iter().all(|l| l.availability.is_available());

        CartQuote {
            lines,
            subtotal_cents: totals.subtotal.cents(),
            delivery_fee_cents: totals.delivery_fee.cents(),
            discount_cents: totals.discount.cents(),
            total_cents: totals.total.cents(),
            can_checkout,
            voucher,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
