//! # stride-db: Database Layer for Stride
//!
//! Database access for the storefront. SQLite through sqlx, with embedded
//! migrations and one repository per table group.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stride Data Flow                               │
//! │                                                                         │
//! │  POST /api/checkout (storefront-api)                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stride-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo   │    │ 001_initial_ │  │   │
//! │  │   │ SqlitePool    │◄───│ OrderRepo     │    │   schema.sql │  │   │
//! │  │   │ Connection    │    │ VoucherRepo   │    │              │  │   │
//! │  │   │ Management    │    │ UserRepo …    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (./stride.db, WAL mode)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stride_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./stride.db")).await?;
//! let brands = db.products().brands().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{Page, PageRequest};

// Repository re-exports for convenience
pub use repository::analytics::{AnalyticsRepository, AnalyticsSummary, StatusCount};
pub use repository::customer::CustomerRepository;
pub use repository::order::{NewOrder, OrderFilter, OrderRepository, ShippingDetails};
pub use repository::product::{ProductFilter, ProductRepository, ProductSort};
pub use repository::review::{RatingSummary, ReviewRepository};
pub use repository::user::UserRepository;
pub use repository::voucher::VoucherRepository;
