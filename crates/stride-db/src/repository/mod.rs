//! # Repository Module
//!
//! Database repository implementations for Stride.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HTTP handler / service                                                │
//! │       │                                                                 │
//! │       │  db.products().list(&filter)                                   │
//! │       ▼                                                                 │
//! │  ProductRepository ── owns the SQL for `products`                      │
//! │  OrderRepository   ── checkout and status transactions                 │
//! │  ...                                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every repository holds a clone of the pool. Multi-table writes take a
//! transaction and never touch the pool again until it commits, so they work
//! with a single-connection (in-memory) pool too.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Catalog queries and admin CRUD
//! - [`order::OrderRepository`] - Order placement, status, tracking
//! - [`voucher::VoucherRepository`] - Voucher lookup and CRUD
//! - [`customer::CustomerRepository`] - Guest customer records
//! - [`user::UserRepository`] - Accounts
//! - [`review::ReviewRepository`] - Reviews and moderation
//! - [`analytics::AnalyticsRepository`] - Back office summary

use serde::Serialize;

pub mod analytics;
pub mod customer;
pub mod order;
pub mod product;
pub mod review;
pub mod user;
pub mod voucher;

// =============================================================================
// Pagination
// =============================================================================

/// 1-based page request, already clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Clamps client input: `page >= 1`, `1 <= per_page <= max`.
    pub fn new(page: Option<i64>, per_page: Option<i64>, default_per_page: i64, max: i64) -> Self {
        PageRequest {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(default_per_page).clamp(1, max),
        }
    }

    #[inline]
    pub fn limit(&self) -> i64 {
        self.per_page
    }

    #[inline]
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::new(None, None, 20, 100)
    }
}

/// One page of results plus the total match count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Page {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
        }
    }

    /// Converts the items, keeping the paging numbers.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
        }
    }

    /// Number of pages for `total` at `per_page`.
    pub fn total_pages(&self) -> i64 {
        if self.total == 0 {
            0
        } else {
            (self.total + self.per_page - 1) / self.per_page
        }
    }
}

// =============================================================================
// Search
// =============================================================================

/// Lower-cased `%query%` with LIKE wildcards escaped, for use with
/// `LIKE ? ESCAPE '\'`.
pub(crate) fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}
