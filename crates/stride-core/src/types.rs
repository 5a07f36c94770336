//! # Domain Types
//!
//! Catalog, customer, account and review types shared by every layer.
//! Order and voucher types live in [`crate::order`] and [`crate::voucher`].
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │      User       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  slug (public)  │   │  phone (key)    │   │  email (login)  │       │
//! │  │  price_cents    │   │  order_count    │   │  role           │       │
//! │  │  condition 1-10 │   │  user_id?       │   │  password_hash  │       │
//! │  │  stock          │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! │                         ┌─────────────────┐                             │
//! │                         │     Review      │  gated by a delivered       │
//! │                         │  rating 1-5     │  order that contains        │
//! │                         │  is_approved    │  the product                │
//! │                         └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has a UUID `id` for relations; storefront-facing entities
//! also carry a human-facing key (`slug`, `order_number`, voucher `code`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Condition
// =============================================================================

/// Display label for a 1-10 condition score.
///
/// ```text
/// 10     Deadstock   never worn
/// 9      Like new
/// 7-8    Excellent
/// 5-6    Good
/// 3-4    Fair
/// 1-2    Worn
/// ```
pub fn condition_label(score: i64) -> &'static str {
    match score {
        s if s >= 10 => "Deadstock",
        9 => "Like new",
        7..=8 => "Excellent",
        5..=6 => "Good",
        3..=4 => "Fair",
        _ => "Worn",
    }
}

// =============================================================================
// Product
// =============================================================================

/// A shoe listing in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// URL key, unique.
    pub slug: String,

    pub name: String,

    pub brand: String,

    /// Free-text size, e.g. "UK 9" or "EU 43".
    pub size: String,

    pub description: Option<String>,

    /// Selling price in minor units.
    pub price_cents: i64,

    /// Retail price when new, for the "x% off retail" badge.
    pub original_price_cents: Option<i64>,

    /// Physical condition, 1 (worn) to 10 (deadstock).
    pub condition_score: i64,

    pub condition_label: String,

    /// Pairs on hand.
    pub stock: i64,

    /// Ordered image URLs; the first one is the cover.
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    pub images: Vec<String>,

    /// Hidden listings are invisible to the storefront but kept for
    /// order history and the back office.
    pub is_visible: bool,

    pub is_featured: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks the listing can be bought in the given quantity.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_visible && self.stock >= quantity
    }

    /// Whole-percent saving against the original retail price, if any.
    ///
    /// A listing at 7,500 against an original 10,000 reports `Some(25)`;
    /// no original price, or one not above the current price, gives `None`.
    pub fn discount_percent(&self) -> Option<i64> {
        let original = self.original_price_cents?;
        if original <= 0 || original <= self.price_cents {
            return None;
        }
        Some((original - self.price_cents) * 100 / original)
    }

    /// First image, used as the cart and order thumbnail.
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

// =============================================================================
// Customer (guest record)
// =============================================================================

/// Denormalized buyer record, upserted on every checkout and keyed by phone.
///
/// Not tied to [`User`] by a foreign key: guests never have an account, and
/// an account holder may check out with a different phone.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    /// Normalized digits-only phone.
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    /// Account that last checked out with this phone, if any.
    pub user_id: Option<String>,
    pub order_count: i64,
    pub total_spent_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User (account)
// =============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum UserRole {
    Customer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Admin => "admin",
        }
    }
}

impl Default for UserRole {
    fn default() -> Self {
        UserRole::Customer
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct User {
    pub id: String,
    /// Lower-cased login email.
    pub email: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    pub password_hash: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

// =============================================================================
// Review
// =============================================================================

/// A product review left by a verified buyer.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub user_id: String,
    pub order_id: String,
    /// Reviewer display name at submission time.
    pub author_name: String,
    /// 1 to 5 stars.
    pub rating: i64,
    pub comment: Option<String>,
    /// Only approved reviews are shown on the storefront.
    pub is_approved: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Test Support
// =============================================================================

/// Fixture builders for this crate's tests and, behind the `test-support`
/// feature, for the other workspace crates' tests.
#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod tests_support {
    use super::*;

    /// A visible product with sensible defaults.
    pub fn product(id: &str, price_cents: i64, stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            slug: format!("shoe-{}", id),
            name: format!("Shoe {}", id),
            brand: "Nike".to_string(),
            size: "UK 9".to_string(),
            description: None,
            price_cents,
            original_price_cents: None,
            condition_score: 8,
            condition_label: condition_label(8).to_string(),
            stock,
            images: vec![format!("https://img.example/{}.jpg", id)],
            is_visible: true,
            is_featured: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::tests_support::product;
    use super::*;

    #[test]
    fn test_condition_labels() {
        assert_eq!(condition_label(10), "Deadstock");
        assert_eq!(condition_label(9), "Like new");
        assert_eq!(condition_label(7), "Excellent");
        assert_eq!(condition_label(5), "Good");
        assert_eq!(condition_label(3), "Fair");
        assert_eq!(condition_label(1), "Worn");
    }

    #[test]
    fn test_can_sell() {
        let mut p = product("a", 1000, 1);
        assert!(p.can_sell(1));
        assert!(!p.can_sell(2));

        p.is_visible = false;
        assert!(!p.can_sell(1));
    }

    #[test]
    fn test_discount_percent() {
        let mut p = product("a", 7_500, 1);
        assert_eq!(p.discount_percent(), None);

        p.original_price_cents = Some(10_000);
        assert_eq!(p.discount_percent(), Some(25));

        // Priced above retail: no badge
        p.original_price_cents = Some(5_000);
        assert_eq!(p.discount_percent(), None);
    }

    #[test]
    fn test_user_password_hash_never_serialized() {
        let now = Utc::now();
        let user = User {
            id: "u1".to_string(),
            email: "a@b.co".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            name: "Ayesha".to_string(),
            phone: None,
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(json.contains("\"role\":\"customer\""));
    }
}
