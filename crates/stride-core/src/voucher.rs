//! # Voucher Engine
//!
//! Validates a voucher code against a cart subtotal and computes the
//! discount.
//!
//! ## Decision Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  evaluate(voucher, subtotal, now)                                       │
//! │       │                                                                 │
//! │       ├── no voucher with that code?     → NotFound                     │
//! │       ├── is_active = false?             → Inactive                     │
//! │       ├── expires_at <= now?             → Expired                      │
//! │       ├── subtotal < min_order?          → BelowMinimum { min }         │
//! │       ├── used_count >= usage_limit?     → UsageExhausted               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  discount = fixed value                                                 │
//! │           | subtotal × value / 100 (half-up), capped by max_discount    │
//! │  discount = clamp(discount, 0, subtotal)                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Evaluation is read-only. Redemption (`used_count + 1`) happens in the
//! order-placement transaction with a guarded update, so the cap holds
//! under concurrent checkouts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Types
// =============================================================================

/// How a voucher's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum DiscountType {
    /// `value` is a whole percent of the subtotal (1-100).
    Percentage,
    /// `value` is an amount in minor units.
    Fixed,
}

/// A discount code.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Voucher {
    pub id: String,
    /// Normalized (trimmed, upper-case) code.
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: i64,
    /// Minimum subtotal for the voucher to apply.
    pub min_order_cents: i64,
    /// Upper bound on a percentage discount.
    pub max_discount_cents: Option<i64>,
    /// `None` means unlimited redemptions.
    pub usage_limit: Option<i64>,
    pub used_count: i64,
    pub is_active: bool,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// True once `expires_at` has been reached.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    /// True when a usage limit exists and has been reached.
    pub fn is_exhausted(&self) -> bool {
        self.usage_limit
            .map(|limit| self.used_count >= limit)
            .unwrap_or(false)
    }

    /// Discount for a subtotal, ignoring eligibility. Never exceeds the
    /// subtotal and never goes negative.
    pub fn discount_for(&self, subtotal: Money) -> Money {
        let raw = match self.discount_type {
            DiscountType::Fixed => Money::from_cents(self.value),
            DiscountType::Percentage => {
                let pct = subtotal.percentage(self.value);
                match self.max_discount_cents {
                    Some(cap) if pct.cents() > cap => Money::from_cents(cap),
                    _ => pct,
                }
            }
        };
        raw.clamp(Money::zero(), subtotal.non_negative())
    }
}

/// Why a voucher code was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoucherRejection {
    #[error("Invalid voucher code")]
    NotFound,

    #[error("This voucher is no longer active")]
    Inactive,

    #[error("This voucher has expired")]
    Expired,

    #[error("Minimum order amount for this voucher is {min_order}")]
    BelowMinimum { min_order: Money },

    #[error("This voucher has reached its usage limit")]
    UsageExhausted,
}

impl VoucherRejection {
    /// Stable machine-readable reason.
    pub fn kind(&self) -> &'static str {
        match self {
            VoucherRejection::NotFound => "not_found",
            VoucherRejection::Inactive => "inactive",
            VoucherRejection::Expired => "expired",
            VoucherRejection::BelowMinimum { .. } => "below_minimum",
            VoucherRejection::UsageExhausted => "usage_exhausted",
        }
    }
}

/// A voucher that passed evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct AppliedVoucher {
    pub voucher_id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub discount_cents: i64,
}

impl AppliedVoucher {
    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }
}

// =============================================================================
// Operations
// =============================================================================

/// Trims and upper-cases a user-typed code.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Validates a looked-up voucher for a subtotal.
///
/// `voucher` is whatever the lookup by normalized code returned; `None`
/// becomes [`VoucherRejection::NotFound`].
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use stride_core::money::Money;
/// use stride_core::voucher::{evaluate, VoucherRejection};
///
/// let result = evaluate(None, Money::from_cents(10_000), Utc::now());
/// assert_eq!(result, Err(VoucherRejection::NotFound));
/// ```
pub fn evaluate(
    voucher: Option<&Voucher>,
    subtotal: Money,
    now: DateTime<Utc>,
) -> Result<AppliedVoucher, VoucherRejection> {
    let voucher = voucher.ok_or(VoucherRejection::NotFound)?;

    if !voucher.is_active {
        return Err(VoucherRejection::Inactive);
    }

    if voucher.is_expired(now) {
        return Err(VoucherRejection::Expired);
    }

    if subtotal.cents() < voucher.min_order_cents {
        return Err(VoucherRejection::BelowMinimum {
            min_order: Money::from_cents(voucher.min_order_cents),
        });
    }

    if voucher.is_exhausted() {
        return Err(VoucherRejection::UsageExhausted);
    }

    Ok(AppliedVoucher {
        voucher_id: voucher.id.clone(),
        code: voucher.code.clone(),
        discount_type: voucher.discount_type,
        discount_cents: voucher.discount_for(subtotal).cents(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher(discount_type: DiscountType, value: i64) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: "v1".to_string(),
            code: "STEP10".to_string(),
            description: None,
            discount_type,
            value,
            min_order_cents: 0,
            max_discount_cents: None,
            usage_limit: None,
            used_count: 0,
            is_active: true,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  step10 "), "STEP10");
    }

    #[test]
    fn test_percentage_discount() {
        let v = voucher(DiscountType::Percentage, 10);
        let applied = evaluate(Some(&v), Money::from_cents(1_234_500), Utc::now()).unwrap();
        assert_eq!(applied.discount_cents, 123_450);
        assert_eq!(applied.code, "STEP10");
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        let v = voucher(DiscountType::Percentage, 15);
        // 15% of 0.99 = 0.1485 → 0.15
        assert_eq!(v.discount_for(Money::from_cents(99)).cents(), 15);
        // 15% of 0.10 = 0.015 → 0.02
        assert_eq!(v.discount_for(Money::from_cents(10)).cents(), 2);
    }

    #[test]
    fn test_percentage_discount_respects_cap() {
        let mut v = voucher(DiscountType::Percentage, 50);
        v.max_discount_cents = Some(100_000);
        assert_eq!(v.discount_for(Money::from_cents(1_000_000)).cents(), 100_000);
        assert_eq!(v.discount_for(Money::from_cents(100_000)).cents(), 50_000);
    }

    #[test]
    fn test_fixed_discount_never_exceeds_subtotal() {
        let v = voucher(DiscountType::Fixed, 500_000);
        let subtotal = Money::from_cents(300_000);
        let applied = evaluate(Some(&v), subtotal, Utc::now()).unwrap();
        assert_eq!(applied.discount(), subtotal);
    }

    #[test]
    fn test_discount_never_exceeds_subtotal_for_any_value() {
        for value in [0, 1, 50, 99, 100, 150, 1_000_000] {
            for subtotal in [0, 1, 99, 10_000, 9_999_999] {
                let subtotal = Money::from_cents(subtotal);
                for kind in [DiscountType::Percentage, DiscountType::Fixed] {
                    let d = voucher(kind, value).discount_for(subtotal);
                    assert!(d <= subtotal, "{:?} {} on {}", kind, value, subtotal);
                    assert!(!d.is_negative());
                }
            }
        }
    }

    #[test]
    fn test_inactive_rejected() {
        let mut v = voucher(DiscountType::Fixed, 100);
        v.is_active = false;
        assert_eq!(
            evaluate(Some(&v), Money::from_cents(10_000), Utc::now()),
            Err(VoucherRejection::Inactive)
        );
    }

    #[test]
    fn test_expired_rejected() {
        let now = Utc::now();
        let mut v = voucher(DiscountType::Fixed, 100);
        v.expires_at = Some(now - Duration::hours(1));
        assert_eq!(
            evaluate(Some(&v), Money::from_cents(10_000), now),
            Err(VoucherRejection::Expired)
        );

        v.expires_at = Some(now + Duration::hours(1));
        assert!(evaluate(Some(&v), Money::from_cents(10_000), now).is_ok());
    }

    #[test]
    fn test_below_minimum_rejected() {
        let mut v = voucher(DiscountType::Fixed, 100);
        v.min_order_cents = 500_000;
        let err = evaluate(Some(&v), Money::from_cents(499_999), Utc::now()).unwrap_err();
        assert_eq!(err.kind(), "below_minimum");
        assert_eq!(
            err.to_string(),
            "Minimum order amount for this voucher is 5,000.00"
        );

        // Exactly the minimum qualifies
        assert!(evaluate(Some(&v), Money::from_cents(500_000), Utc::now()).is_ok());
    }

    #[test]
    fn test_usage_exhausted_rejected() {
        let mut v = voucher(DiscountType::Fixed, 100);
        v.usage_limit = Some(3);
        v.used_count = 2;
        assert!(evaluate(Some(&v), Money::from_cents(10_000), Utc::now()).is_ok());

        v.used_count = 3;
        assert_eq!(
            evaluate(Some(&v), Money::from_cents(10_000), Utc::now()),
            Err(VoucherRejection::UsageExhausted)
        );
    }

    #[test]
    fn test_rejection_serializes_with_kind() {
        let json = serde_json::to_value(VoucherRejection::BelowMinimum {
            min_order: Money::from_cents(100),
        })
        .unwrap();
        assert_eq!(json["kind"], "below_minimum");
        assert_eq!(json["min_order"], 100);
    }
}
