//! # Order Lifecycle
//!
//! Order status machine, totals arithmetic and order-number generation.
//!
//! ## Status Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  pending ──► confirmed ──► processing ──► shipped ──► delivered         │
//! │     │            │              │            │            │             │
//! │     └────────────┴──────────────┴──► cancelled            │             │
//! │                                              └──► returned ◄┘            │
//! │                                                                         │
//! │  cancelled / returned are terminal. Only admins move orders.            │
//! │  Entering cancelled / returned puts the stock back.                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::ORDER_NUMBER_PREFIX;

// =============================================================================
// Order Status
// =============================================================================

/// Where an order is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum OrderStatus {
    /// Placed, awaiting review by the shop.
    Pending,
    /// Accepted (payment proof checked for bank transfers).
    Confirmed,
    /// Being cleaned / packed.
    Processing,
    /// Handed to the courier.
    Shipped,
    /// Received by the buyer.
    Delivered,
    /// Abandoned before shipping.
    Cancelled,
    /// Sent back after shipping.
    Returned,
}

impl OrderStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Returned => "returned",
        }
    }

    /// Statuses reachable from this one in a single step.
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Processing, Cancelled],
            Processing => &[Shipped, Cancelled],
            Shipped => &[Delivered, Returned],
            Delivered => &[Returned],
            Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Checks a transition, returning the typed error when refused.
    pub fn transition_to(&self, next: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                from: *self,
                to: next,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_statuses().is_empty()
    }

    /// Entering this status gives the pairs back to inventory.
    pub fn restocks(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Returned)
    }

    /// Orders in these statuses count towards revenue.
    pub fn counts_as_revenue(&self) -> bool {
        !self.restocks()
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.to_string()).collect(),
            })
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMethod {
    /// Paid to the courier on delivery.
    CashOnDelivery,
    /// Paid up front; the buyer uploads a transfer receipt.
    BankTransfer,
}

impl PaymentMethod {
    pub fn requires_proof(&self) -> bool {
        matches!(self, PaymentMethod::BankTransfer)
    }
}

// =============================================================================
// Order Item (snapshot)
// =============================================================================

/// A purchased line, frozen at checkout.
///
/// Stored as part of the order's JSON snapshot, so later catalog edits never
/// rewrite order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct OrderItem {
    pub product_id: String,
    pub slug: String,
    pub name: String,
    pub brand: String,
    pub size: String,
    pub condition_score: i64,
    pub image: Option<String>,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub line_total_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// The money side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub discount: Money,
    pub total: Money,
}

impl OrderTotals {
    /// `total = subtotal + delivery_fee - discount`, floored at zero.
    ///
    /// The discount is first clamped to `[0, subtotal]`, so a voucher never
    /// eats into the delivery fee.
    pub fn compute(subtotal: Money, delivery_fee: Money, discount: Money) -> Self {
        let subtotal = subtotal.non_negative();
        let delivery_fee = delivery_fee.non_negative();
        let discount = discount.clamp(Money::zero(), subtotal);
        let total = (subtotal + delivery_fee - discount).non_negative();

        OrderTotals {
            subtotal,
            delivery_fee,
            discount,
            total,
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A placed order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Order {
    pub id: String,
    /// Human-readable unique number, e.g. `STR-261019-7KQ2MX`.
    pub order_number: String,
    /// Account that placed the order, if signed in.
    pub user_id: Option<String>,
    pub customer_id: String,

    pub customer_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub notes: Option<String>,

    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,

    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub items: Vec<OrderItem>,

    pub subtotal_cents: i64,
    pub delivery_fee_cents: i64,
    pub discount_cents: i64,
    pub voucher_code: Option<String>,
    pub total_cents: i64,

    pub status: OrderStatus,
    pub tracking_number: Option<String>,
    pub courier: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub confirmed_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub shipped_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn totals(&self) -> OrderTotals {
        OrderTotals {
            subtotal: Money::from_cents(self.subtotal_cents),
            delivery_fee: Money::from_cents(self.delivery_fee_cents),
            discount: Money::from_cents(self.discount_cents),
            total: Money::from_cents(self.total_cents),
        }
    }

    /// Whether the order contains the given product.
    pub fn contains_product(&self, product_id: &str) -> bool {
        self.items.iter().any(|item| item.product_id == product_id)
    }

    /// Total pairs in the order.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

// =============================================================================
// Order Number
// =============================================================================

/// Unambiguous alphabet: no 0/O or 1/I.
const ORDER_NUMBER_ALPHABET: &[u8; 32] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random characters per order number (30 bits of entropy per day).
const ORDER_NUMBER_RANDOM_LEN: usize = 6;

/// Builds an order number in format `STR-YYMMDD-XXXXXX`.
///
/// The date part keeps numbers readable over the phone; the random part
/// comes from `entropy`. Uniqueness is finally enforced by the database
/// index, and the caller retries with fresh entropy on collision.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use stride_core::order::generate_order_number;
///
/// let at = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
/// let number = generate_order_number(at, 0);
/// assert_eq!(number, "STR-261019-AAAAAA");
/// ```
pub fn generate_order_number(now: DateTime<Utc>, entropy: u128) -> String {
    let mut bits = entropy;
    let mut suffix = String::with_capacity(ORDER_NUMBER_RANDOM_LEN);
    for _ in 0..ORDER_NUMBER_RANDOM_LEN {
        let idx = (bits & 0x1f) as usize;
        suffix.push(ORDER_NUMBER_ALPHABET[idx] as char);
        bits >>= 5;
    }

    format!(
        "{}-{}-{}",
        ORDER_NUMBER_PREFIX,
        now.format("%y%m%d"),
        suffix
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_happy_path_transitions() {
        let path = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Returned,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_rejected_transitions() {
        assert!(!OrderStatus::Delivered.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));

        let err = OrderStatus::Cancelled
            .transition_to(OrderStatus::Confirmed)
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidStatusTransition { .. }));
    }

    #[test]
    fn test_terminal_statuses() {
        for status in OrderStatus::ALL {
            let terminal = matches!(status, OrderStatus::Cancelled | OrderStatus::Returned);
            assert_eq!(status.is_terminal(), terminal, "{}", status);
            assert_eq!(status.restocks(), terminal, "{}", status);
        }
    }

    #[test]
    fn test_status_parse_and_display() {
        for status in OrderStatus::ALL {
            assert_eq!(status.to_string().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_totals_formula() {
        let t = OrderTotals::compute(
            Money::from_cents(1_000_000),
            Money::from_cents(25_000),
            Money::from_cents(100_000),
        );
        assert_eq!(t.total.cents(), 925_000);
    }

    #[test]
    fn test_totals_never_negative_and_discount_clamped() {
        let t = OrderTotals::compute(
            Money::from_cents(10_000),
            Money::from_cents(2_500),
            Money::from_cents(50_000),
        );
        assert_eq!(t.discount.cents(), 10_000);
        assert_eq!(t.total.cents(), 2_500);

        let t = OrderTotals::compute(Money::zero(), Money::zero(), Money::from_cents(10));
        assert_eq!(t.total, Money::zero());
        assert_eq!(t.discount, Money::zero());
    }

    #[test]
    fn test_order_number_format() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        let number = generate_order_number(at, 0b11111_00001);
        assert_eq!(number, "STR-260105-B9AAAA");
        assert_eq!(number.len(), "STR-260105-".len() + ORDER_NUMBER_RANDOM_LEN);
    }

    #[test]
    fn test_distinct_entropy_gives_distinct_numbers() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        // Only the low 30 bits are used; anything below that maps one to one.
        let numbers: HashSet<String> = (0..2_000u128)
            .map(|i| generate_order_number(at, i * 524_287))
            .collect();
        assert_eq!(numbers.len(), 2_000);

        assert_eq!(
            generate_order_number(at, 42),
            generate_order_number(at, 42 | (1 << 30))
        );
    }

    #[test]
    fn test_payment_method_proof() {
        assert!(PaymentMethod::BankTransfer.requires_proof());
        assert!(!PaymentMethod::CashOnDelivery.requires_proof());
    }
}
