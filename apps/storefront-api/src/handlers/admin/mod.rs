//! # Back Office Handlers
//!
//! JSON endpoints under `/api/admin`. Every handler takes [`AdminUser`],
//! so a missing session is 401 and a customer session is 403.
//!
//! [`AdminUser`]: crate::auth::AdminUser

pub mod analytics;
pub mod customers;
pub mod orders;
pub mod products;
pub mod reviews;
pub mod vouchers;
