//! # Validation Module
//!
//! Input validation utilities for Stride.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Storefront (browser)                                         │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: HTTP handler (Rust)                                          │
//! │  ├── Type validation (JSON deserialization)                            │
//! │  └── THIS MODULE: field rules, normalization                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE constraints (slug, email, voucher code, order number)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that normalize return the cleaned value so handlers store
//! exactly what was checked.
//!
//! ## Usage
//! ```rust
//! use stride_core::validation::{normalize_phone, validate_quantity};
//!
//! assert_eq!(normalize_phone("+92 300-1234567").unwrap(), "923001234567");
//! validate_quantity(2).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Trims a required text field and bounds its length (in characters).
///
/// ## Returns
/// The trimmed value.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Like [`validate_text`] for optional fields: blank becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) => validate_text(field, v, max).map(Some),
    }
}

/// Validates a product name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use stride_core::validation::validate_product_name;
///
/// assert!(validate_product_name("Air Jordan 1 Mid").is_ok());
/// assert!(validate_product_name("  ").is_err());
/// ```
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    validate_text("name", name, 200)
}

/// Validates a search query.
///
/// ## Rules
/// - Can be empty (returns the default listing)
/// - Maximum 100 characters
///
/// ## Returns
/// The trimmed query string.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "q".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates and lower-cases an email address.
///
/// Deliberately loose: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim().to_lowercase();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::invalid("email", "not a valid email address"));
    }

    Ok(email)
}

/// Strips a phone number down to its digits and checks the length.
///
/// Tracking lookups compare normalized numbers, so `0300-1234567` and
/// `03001234567` match.
///
/// ## Example
/// ```rust
/// use stride_core::validation::normalize_phone;
///
/// assert_eq!(normalize_phone("0300-123 4567").unwrap(), "03001234567");
/// assert!(normalize_phone("12345").is_err());
/// ```
pub fn normalize_phone(phone: &str) -> ValidationResult<String> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Err(ValidationError::required("phone"));
    }

    if let Some(bad) = phone
        .chars()
        .find(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')')))
    {
        return Err(ValidationError::invalid(
            "phone",
            format!("unexpected character '{}'", bad),
        ));
    }

    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if !(7..=15).contains(&digits.len()) {
        return Err(ValidationError::invalid("phone", "must have 7 to 15 digits"));
    }

    Ok(digits)
}

/// Builds a URL slug from free text: lower-case ASCII letters and digits
/// separated by single hyphens.
///
/// ## Example
/// ```rust
/// use stride_core::validation::slugify;
///
/// assert_eq!(slugify("Nike Air Max 90 (UK 9)"), "nike-air-max-90-uk-9");
/// ```
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Validates a slug supplied by the back office.
pub fn validate_slug(slug: &str) -> ValidationResult<String> {
    let slug = validate_text("slug", slug, 120)?;

    let well_formed = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && !slug.contains("--");

    if !well_formed {
        return Err(ValidationError::invalid(
            "slug",
            "must contain only lower-case letters, digits and single hyphens",
        ));
    }

    Ok(slug)
}

/// Validates and normalizes a voucher code.
///
/// ## Rules
/// - 3 to 32 characters after trimming
/// - Letters, digits, hyphens and underscores only
///
/// ## Returns
/// The upper-cased code.
pub fn validate_voucher_code(code: &str) -> ValidationResult<String> {
    let code = code.trim().to_uppercase();

    if code.is_empty() {
        return Err(ValidationError::required("code"));
    }

    if code.len() < 3 {
        return Err(ValidationError::TooShort {
            field: "code".to_string(),
            min: 3,
        });
    }

    if code.len() > 32 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 32,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::invalid(
            "code",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(code)
}

/// Checks password length (8 to 128 characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    let len = password.chars().count();

    if len < 8 {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: 8,
        });
    }

    if len > 128 {
        return Err(ValidationError::TooLong {
            field: "password".to_string(),
            max: 128,
        });
    }

    Ok(())
}

/// Validates an optional http(s) URL (product images, payment proofs).
pub fn validate_url(field: &str, url: &str) -> ValidationResult<String> {
    let url = validate_text(field, url, 2048)?;

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));

    match rest {
        Some(host) if !host.is_empty() && !url.chars().any(char::is_whitespace) => Ok(url),
        _ => Err(ValidationError::invalid(field, "must be an http(s) URL")),
    }
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY (10)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Must not exceed [`MAX_PRICE_CENTS`]
///
/// ## Example
/// ```rust
/// use stride_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("price", 1_299_900).is_ok());
/// assert!(validate_price_cents("price", -100).is_err());
/// assert!(validate_price_cents("price", i64::MAX / 2).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

/// Stock can be zero (sold out) but never negative.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::OutOfRange {
            field: "stock".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

fn validate_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Condition score of a listed shoe: 1..=10.
pub fn validate_condition_score(score: i64) -> ValidationResult<()> {
    validate_range("conditionScore", score, 1, 10)
}

/// Review rating: 1..=5 stars.
pub fn validate_rating(rating: i64) -> ValidationResult<()> {
    validate_range("rating", rating, 1, 5)
}

/// Percentage vouchers take a whole percent in 1..=100.
pub fn validate_percentage(value: i64) -> ValidationResult<()> {
    validate_range("value", value, 1, 100)
}

// =============================================================================
// ID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str, field_name: &str) -> ValidationResult<()> {
    if uuid::Uuid::parse_str(id).is_err() {
        return Err(ValidationError::InvalidFormat {
            field: field_name.to_string(),
            reason: "must be a valid UUID".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("name", "  Ali  ", 10).unwrap(), "Ali");
        assert!(validate_text("name", "   ", 10).is_err());
        assert!(validate_text("name", "abcdefghijk", 10).is_err());
        // Length counts characters, not bytes
        assert!(validate_text("city", "Štúrovo", 7).is_ok());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("notes", None, 10).unwrap(), None);
        assert_eq!(validate_optional_text("notes", Some("  "), 10).unwrap(), None);
        assert_eq!(
            validate_optional_text("notes", Some(" gate 2 "), 10).unwrap(),
            Some("gate 2".to_string())
        );
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(validate_email(" Ayesha@Mail.COM ").unwrap(), "ayesha@mail.com");
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("a@b").is_err());
        assert!(validate_email("a@@b.com").is_err());
        assert!(validate_email("a b@c.com").is_err());
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+92 (300) 123-4567").unwrap(), "923001234567");
        assert!(normalize_phone("").is_err());
        assert!(normalize_phone("0300-CALL-ME").is_err());
        assert!(normalize_phone("123").is_err());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Yeezy Boost 350 V2"), "yeezy-boost-350-v2");
        assert_eq!(slugify("  --New Balance 550--  "), "new-balance-550");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("air-max-90").is_ok());
        assert!(validate_slug("Air-Max").is_err());
        assert!(validate_slug("air--max").is_err());
        assert!(validate_slug("-air").is_err());
    }

    #[test]
    fn test_validate_voucher_code() {
        assert_eq!(validate_voucher_code(" eid-25 ").unwrap(), "EID-25");
        assert!(validate_voucher_code("AB").is_err());
        assert!(validate_voucher_code("SAVE 10").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("hunter22").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("image", "https://cdn.example.com/a.jpg").is_ok());
        assert!(validate_url("image", "ftp://cdn.example.com/a.jpg").is_err());
        assert!(validate_url("image", "https://").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(10).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(11).is_err());
    }

    #[test]
    fn test_numeric_ranges() {
        assert!(validate_condition_score(1).is_ok());
        assert!(validate_condition_score(11).is_err());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_percentage(100).is_ok());
        assert!(validate_percentage(101).is_err());
        assert!(validate_stock(0).is_ok());
        assert!(validate_stock(-1).is_err());
        assert!(validate_price_cents("price", 0).is_ok());
    }

    #[test]
    fn test_price_is_capped() {
        assert!(validate_price_cents("priceCents", MAX_PRICE_CENTS).is_ok());
        assert!(matches!(
            validate_price_cents("priceCents", MAX_PRICE_CENTS + 1),
            Err(ValidationError::OutOfRange { max: MAX_PRICE_CENTS, .. })
        ));
        assert!(validate_price_cents("priceCents", i64::MAX / 2).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000", "id").is_ok());
        assert!(validate_uuid("not-a-uuid", "id").is_err());
    }
}
