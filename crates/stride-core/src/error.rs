//! # Error Types
//!
//! Domain-specific error types for stride-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stride-core errors (this file)                                        │
//! │  ├── CoreError          - Business rule violations                     │
//! │  ├── ValidationError    - Input validation failures                    │
//! │  └── VoucherRejection   - Why a voucher code was refused (voucher.rs)  │
//! │                                                                         │
//! │  stride-db errors (separate crate)                                     │
//! │  └── DbError            - Database operation failures                  │
//! │                                                                         │
//! │  HTTP errors (storefront-api)                                          │
//! │  └── ApiError           - { code, message } JSON body + status         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → HTTP 4xx               │
//! │        sqlx::Error → DbError → ApiError → HTTP 4xx/5xx                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::order::OrderStatus;
use crate::voucher::VoucherRejection;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the checkout, order and review flows.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product id or slug does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product exists but is hidden from the storefront.
    #[error("{name} is no longer available")]
    ProductUnavailable { name: String },

    /// Not enough pairs left for the requested quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (qty: 2)
    ///      │
    ///      ▼
    /// Stock check: available = 1
    ///      │
    ///      ▼
    /// InsufficientStock { name: "Air Max 90", available: 1, requested: 2 }
    ///      │
    ///      ▼
    /// UI shows: "Only 1 left of Air Max 90"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        name: String,
        available: i64,
        requested: i64,
    },

    /// Order number does not exist (or does not belong to the caller).
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Order status change that the lifecycle does not allow.
    #[error("Cannot move order from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Checkout with nothing in the cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Voucher code refused.
    #[error("{0}")]
    VoucherRejected(#[from] VoucherRejection),

    /// Bank transfer orders must carry a payment proof.
    #[error("Payment proof is required for bank transfer orders")]
    PaymentProofRequired,

    /// Review submission refused by the purchase check.
    #[error("Review not allowed: {reason}")]
    ReviewNotAllowed { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs; each variant names the field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid email, invalid phone).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Shorthand for [`ValidationError::InvalidFormat`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            name: "Air Max 90".to_string(),
            available: 1,
            requested: 2,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Air Max 90: available 1, requested 2"
        );

        let err = CoreError::InvalidStatusTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "Cannot move order from delivered to pending");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("phone");
        assert_eq!(err.to_string(), "phone is required");

        let err = ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        };
        assert_eq!(err.to_string(), "password must be at least 8 characters");
    }

    #[test]
    fn test_voucher_rejection_converts_to_core_error() {
        let core_err: CoreError = VoucherRejection::Inactive.into();
        assert!(matches!(core_err, CoreError::VoucherRejected(_)));
        assert_eq!(core_err.to_string(), "This voucher is no longer active");
    }
}
