//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004                                      │
//! │                                                                         │
//! │  A 15% voucher on 4,999.00 computed in floats can land a paisa off     │
//! │  between the cart page and the order record.                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units                                      │
//! │    499900 × 15 / 100 = 74985 (exact, rounding is explicit)             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stride_core::money::Money;
//!
//! let price = Money::from_cents(1_299_900); // 12,999.00
//! let pair = price * 2;
//! let off = price.percentage(15);           // 15% of the price
//! assert_eq!(pair.cents(), 2_599_800);
//! assert_eq!(off.cents(), 194_985);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction can go negative mid-calculation; totals
///   are clamped explicitly where the business rules demand it
/// - **Single field tuple struct**: zero-cost abstraction over i64
/// - **Serialized as a bare integer**: the API speaks minor units
///
/// ## Where Money is Used
/// ```text
/// Product.price_cents ──► PricedLine.line_total ──► CartQuote.subtotal
///                                                        │
///          Voucher.discount_for(subtotal) ◄──────────────┤
///                                                        ▼
///          OrderTotals { subtotal, delivery_fee, discount, total }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use stride_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units.
    ///
    /// For negative amounts only the major unit carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use stride_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(899_900);
    /// assert_eq!(unit_price.multiply_quantity(2).cents(), 1_799_800);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `percent`% of this amount, rounded half-up to the nearest
    /// minor unit.
    ///
    /// ## Implementation
    /// Integer math: `(amount * percent + 50) / 100`. The `+50` rounds the
    /// half minor unit up. `i128` keeps large carts from overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use stride_core::money::Money;
    ///
    /// // 12.50 at 10% = 1.25
    /// assert_eq!(Money::from_cents(1250).percentage(10).cents(), 125);
    /// // 0.05 at 10% = 0.005 → rounds up to 0.01
    /// assert_eq!(Money::from_cents(5).percentage(10).cents(), 1);
    /// ```
    pub fn percentage(&self, percent: i64) -> Money {
        let scaled = self.0 as i128 * percent as i128;
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        Money(rounded as i64)
    }

    /// Clamps the value into `[min, max]`.
    #[inline]
    pub fn clamp(self, min: Money, max: Money) -> Money {
        Money(self.0.clamp(min.0, max.0))
    }

    /// Floors negative values at zero.
    #[inline]
    pub fn non_negative(self) -> Money {
        Money(self.0.max(0))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain `major.minor` rendering with thousands separators, for logs.
///
/// Currency symbols and locale formatting belong to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let digits = self.major().abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }
        write!(f, "{}{}.{:02}", sign, grouped, self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.major(), 10);
        assert_eq!(money.minor(), 99);
    }

    #[test]
    fn test_from_major_minor() {
        assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_cents(1099).to_string(), "10.99");
        assert_eq!(Money::from_cents(1_299_900).to_string(), "12,999.00");
        assert_eq!(Money::from_cents(123_456_789).to_string(), "1,234,567.89");
        assert_eq!(Money::from_cents(-550).to_string(), "-5.50");
        assert_eq!(Money::zero().to_string(), "0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        // 10% of 12.35 = 1.235 → 1.24
        assert_eq!(Money::from_cents(1235).percentage(10).cents(), 124);
        // 10% of 12.34 = 1.234 → 1.23
        assert_eq!(Money::from_cents(1234).percentage(10).cents(), 123);
        // 100% is the identity
        assert_eq!(Money::from_cents(4999).percentage(100).cents(), 4999);
        assert_eq!(Money::from_cents(4999).percentage(0).cents(), 0);
    }

    #[test]
    fn test_percentage_large_amounts_do_not_overflow() {
        let big = Money::from_cents(i64::MAX / 10);
        let half = big.percentage(50);
        assert!(half.is_positive());
    }

    #[test]
    fn test_clamp_and_non_negative() {
        let subtotal = Money::from_cents(1000);
        assert_eq!(
            Money::from_cents(1500).clamp(Money::zero(), subtotal),
            subtotal
        );
        assert_eq!(Money::from_cents(-20).non_negative(), Money::zero());
        assert_eq!(Money::from_cents(20).non_negative().cents(), 20);
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());
        assert!(Money::from_cents(-1).is_negative());
    }
}
