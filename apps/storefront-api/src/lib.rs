//! # Stride Storefront API
//!
//! JSON HTTP server for the Stride shoe resale storefront and its back
//! office.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API Server                            │
//! │                                                                         │
//! │  Browser ───► axum (8080) ───► Handlers ───► Services ───► SQLite      │
//! │                   │                              │                      │
//! │                   ▼                              ▼                      │
//! │             TraceLayer / CORS             stride-core rules             │
//! │             JWT extractors                (vouchers, totals,            │
//! │                                            status machine)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`build_router`] is what `main` serves and what the integration tests
//! drive in-process.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod services;
pub mod state;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::routing::{get, patch, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::handlers::{account, admin, auth as session, cart, catalog, checkout, orders};

pub use crate::error::{ApiError, ApiResult, ErrorCode};
pub use crate::state::AppState;

/// Builds the full route table.
pub fn build_router(state: AppState) -> Router {
    let storefront = Router::new()
        .route("/products", get(catalog::list_products))
        .route("/products/{slug}", get(catalog::get_product))
        .route("/products/{slug}/reviews", get(catalog::product_reviews))
        .route("/brands", get(catalog::list_brands))
        .route("/cart/quote", post(cart::quote))
        .route("/vouchers/apply", post(cart::apply_voucher))
        .route("/checkout", post(checkout::place_order))
        .route("/orders/track", get(orders::track))
        .route("/auth/register", post(session::register))
        .route("/auth/login", post(session::login))
        .route("/auth/refresh", post(session::refresh))
        .route("/account/me", get(account::me).put(account::update_me))
        .route("/account/orders", get(account::my_orders))
        .route("/account/orders/{order_number}", get(account::my_order))
        .route("/reviews", post(account::submit_review));

    let back_office = Router::new()
        .route(
            "/products",
            get(admin::products::list).post(admin::products::create),
        )
        .route(
            "/products/{id}",
            put(admin::products::update).delete(admin::products::delete),
        )
        .route(
            "/products/{id}/stock",
            patch(admin::products::adjust_stock),
        )
        .route("/orders", get(admin::orders::list))
        .route("/orders/{order_number}", get(admin::orders::get))
        .route(
            "/orders/{order_number}/status",
            patch(admin::orders::update_status),
        )
        .route(
            "/orders/{order_number}/tracking",
            patch(admin::orders::update_tracking),
        )
        .route("/customers", get(admin::customers::list_customers))
        .route("/users", get(admin::customers::list_users))
        .route(
            "/vouchers",
            get(admin::vouchers::list).post(admin::vouchers::create),
        )
        .route(
            "/vouchers/{id}",
            put(admin::vouchers::update).delete(admin::vouchers::delete),
        )
        .route("/reviews", get(admin::reviews::list))
        .route(
            "/reviews/{id}",
            patch(admin::reviews::moderate).delete(admin::reviews::delete),
        )
        .route("/analytics/summary", get(admin::analytics::summary));

    let cors = cors_layer(state.config.cors_allowed_origin.as_deref());

    let router = Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", storefront)
        .nest("/api/admin", back_office)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origin: Option<&str>) -> Option<CorsLayer> {
    let origin = origin?;
    match origin.parse::<HeaderValue>() {
        Ok(value) => Some(
            CorsLayer::new()
                .allow_origin(value)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::PATCH,
                    Method::DELETE,
                ])
                .allow_headers([AUTHORIZATION, CONTENT_TYPE]),
        ),
        Err(_) => {
            warn!(origin, "Ignoring unparsable CORS origin");
            None
        }
    }
}

/// Creates or promotes the configured admin account.
pub async fn bootstrap_admin(state: &AppState) -> ApiResult<()> {
    let (Some(email), Some(password)) = (
        state.config.admin_email.as_deref(),
        state.config.admin_password.as_deref(),
    ) else {
        return Ok(());
    };

    let existing = state.db.users().get_by_email(email).await?;
    // An existing account keeps its password; no need to hash.
    let password_hash = match existing {
        Some(_) => String::new(),
        None => hash_password(password)?,
    };

    if state
        .db
        .users()
        .ensure_admin(email, &password_hash, "Administrator")
        .await?
    {
        info!(email, "Admin account ready");
    }

    Ok(())
}

/// Convenience for `main` and tests: config → state.
pub async fn app_state(db: stride_db::Database, config: AppConfig) -> ApiResult<AppState> {
    let state = AppState::new(db, config);
    bootstrap_admin(&state).await?;
    Ok(state)
}
