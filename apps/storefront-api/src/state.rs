//! # Application State
//!
//! Shared by every handler through axum's `State` extractor.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                           AppState (Clone)                              │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────────────┐  │
//! │  │  Database    │  │  Arc<JwtManager> │  │  Arc<AppConfig>          │  │
//! │  │  (SQLite     │  │  sign / verify   │  │  delivery policy, CORS,  │  │
//! │  │   pool)      │  │  session tokens  │  │  token lifetimes         │  │
//! │  └──────────────┘  └──────────────────┘  └──────────────────────────┘  │
//! │                                                                         │
//! │  Everything is read-only after startup; the pool is internally         │
//! │  synchronized, so cloning the state per request is cheap.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use stride_core::DeliveryPolicy;
use stride_db::Database;

use crate::auth::JwtManager;
use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let jwt = JwtManager::new(
            config.jwt_secret.clone(),
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
        );

        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    pub fn delivery_policy(&self) -> DeliveryPolicy {
        self.config.delivery_policy()
    }
}
