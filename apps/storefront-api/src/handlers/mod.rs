//! # HTTP Handlers
//!
//! One module per area of the API. Handlers stay thin: parse, call a
//! repository or service, shape the JSON.
//!
//! ## Handler Organization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Handler Modules                                  │
//! │                                                                         │
//! │  catalog.rs   products, product detail, brands, product reviews        │
//! │  cart.rs      cart quote, voucher apply                                │
//! │  checkout.rs  order placement (guest or signed in)                     │
//! │  orders.rs    guest tracking by order number + phone                   │
//! │  auth.rs      register, login, refresh                                 │
//! │  account.rs   profile, own orders, review submission                   │
//! │  admin/       back office (products, orders, customers, vouchers,      │
//! │               reviews, analytics)                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use stride_core::Product;
use stride_db::PageRequest;

use crate::state::AppState;

/// A product plus fields derived for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discount_percent: Option<i64>,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        ProductView {
            discount_percent: product.discount_percent(),
            product,
        }
    }
}

/// `?page=&per_page=` on list endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Paging {
    /// Back office default: 20 per page, at most 100.
    pub fn request(&self) -> PageRequest {
        PageRequest::new(self.page, self.per_page, 20, 100)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: if database { "ok" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
