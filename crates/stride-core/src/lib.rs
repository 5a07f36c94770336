//! # stride-core: Pure Business Logic for Stride
//!
//! The checkout and voucher rules of the storefront live here as pure
//! functions over plain data. Nothing in this crate touches the database,
//! the network or the clock (callers pass `now` in).
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stride Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Storefront / Back office (web)                  │   │
//! │  │   Catalog ──► Cart ──► Checkout ──► Tracking      Admin panel   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  storefront-api (axum handlers)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stride-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │  ┌────────┐ ┌─────────┐ ┌────────┐ ┌────────┐ ┌────────────┐   │   │
//! │  │  │ money  │ │ voucher │ │ order  │ │  cart  │ │ validation │   │   │
//! │  │  └────────┘ └─────────┘ └────────┘ └────────┘ └────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stride-db (SQLite repositories)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog, customer, account and review types
//! - [`money`] - Integer money in minor units
//! - [`voucher`] - Voucher validation and discount calculation
//! - [`order`] - Order status machine, totals and order numbers
//! - [`cart`] - Server-side cart pricing
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stride_core::money::Money;
//! use stride_core::order::OrderTotals;
//!
//! let totals = OrderTotals::compute(
//!     Money::from_cents(1_000_000),
//!     Money::from_cents(25_000),
//!     Money::from_cents(100_000),
//! );
//! assert_eq!(totals.total.cents(), 925_000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod order;
pub mod types;
pub mod validation;
pub mod voucher;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{
    CartLineRequest, CartQuote, DeliveryPolicy, LineAvailability, PricedLine, QuotedVoucher,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use order::{Order, OrderItem, OrderStatus, OrderTotals, PaymentMethod};
pub use types::*;
pub use voucher::{AppliedVoucher, DiscountType, Voucher, VoucherRejection};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct products in one cart.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity of a single product in one order.
///
/// Resale stock is usually one pair per listing; the cap stops typos like
/// `100` instead of `1` from reaching checkout.
pub const MAX_LINE_QUANTITY: i64 = 10;

/// Prefix of every human-readable order number.
pub const ORDER_NUMBER_PREFIX: &str = "STR";

/// Stock level at or below which a visible product is reported as low.
pub const LOW_STOCK_THRESHOLD: i64 = 1;

/// Upper bound for any stored amount: prices, fixed discounts, voucher
/// minimums and the delivery fee (10 billion major units).
///
/// With this cap a full cart (`MAX_CART_LINES` lines of
/// `MAX_LINE_QUANTITY` pairs) plus the delivery fee stays far below
/// `i64::MAX`, so [`money::Money`] arithmetic on validated data cannot
/// overflow.
pub const MAX_PRICE_CENTS: i64 = 1_000_000_000_000;

const _: () = assert!(
    MAX_PRICE_CENTS * MAX_LINE_QUANTITY * MAX_CART_LINES as i64 + MAX_PRICE_CENTS
        < i64::MAX / 100
);
