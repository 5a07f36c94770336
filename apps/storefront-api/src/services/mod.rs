//! Service layer: multi-step operations shared by handlers.

pub mod checkout;
pub mod reviews;

pub use checkout::{CheckoutReceipt, CheckoutRequest, CheckoutService, QuoteRequest};
pub use reviews::{ReviewRequest, ReviewService};
