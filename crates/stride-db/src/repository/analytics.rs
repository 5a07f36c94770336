//! # Analytics Repository
//!
//! Aggregate numbers for the back office dashboard.
//!
//! ```text
//! revenue      = Σ total_cents  over orders NOT IN (cancelled, returned)
//! average      = revenue / count(those orders), 0 when there are none
//! low stock    = visible products with stock <= LOW_STOCK_THRESHOLD
//! ```

use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use stride_core::{OrderStatus, LOW_STOCK_THRESHOLD};

/// Orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: i64,
}

/// Back office summary numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_orders: i64,
    /// Every status, zero counts included, in lifecycle order.
    pub orders_by_status: Vec<StatusCount>,
    pub revenue_cents: i64,
    pub average_order_value_cents: i64,
    pub customer_count: i64,
    pub registered_user_count: i64,
    pub product_count: i64,
    pub low_stock_count: i64,
}

/// Repository for dashboard aggregates.
#[derive(Debug, Clone)]
pub struct AnalyticsRepository {
    pool: SqlitePool,
}

impl AnalyticsRepository {
    /// Creates a new AnalyticsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AnalyticsRepository { pool }
    }

    /// Computes the dashboard summary.
    pub async fn summary(&self) -> DbResult<AnalyticsSummary> {
        debug!("Computing analytics summary");

        let rows: Vec<(OrderStatus, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM orders GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let orders_by_status: Vec<StatusCount> = OrderStatus::ALL
            .iter()
            .map(|status| StatusCount {
                status: *status,
                count: rows
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect();
        let total_orders = orders_by_status.iter().map(|s| s.count).sum();

        let (revenue_cents, revenue_orders): (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(total_cents), 0), COUNT(*) FROM orders \
             WHERE status NOT IN ('cancelled', 'returned')",
        )
        .fetch_one(&self.pool)
        .await?;

        let average_order_value_cents = if revenue_orders > 0 {
            revenue_cents / revenue_orders
        } else {
            0
        };

        let customer_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        let registered_user_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'customer'")
                .fetch_one(&self.pool)
                .await?;

        let product_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        let low_stock_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products WHERE is_visible = 1 AND stock <= ?1",
        )
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_one(&self.pool)
        .await?;

        Ok(AnalyticsSummary {
            total_orders,
            orders_by_status,
            revenue_cents,
            average_order_value_cents,
            customer_count,
            registered_user_count,
            product_count,
            low_stock_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};
    use stride_core::types::tests_support::product;

    #[tokio::test]
    async fn test_empty_summary() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let summary = db.analytics().summary().await.unwrap();

        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.revenue_cents, 0);
        assert_eq!(summary.average_order_value_cents, 0);
        assert_eq!(summary.orders_by_status.len(), 7);
    }

    #[tokio::test]
    async fn test_low_stock_counts_visible_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&product("a", 1_000, 1)).await.unwrap();
        db.products().insert(&product("b", 1_000, 5)).await.unwrap();
        let mut hidden = product("c", 1_000, 0);
        hidden.is_visible = false;
        db.products().insert(&hidden).await.unwrap();

        let summary = db.analytics().summary().await.unwrap();
        assert_eq!(summary.product_count, 3);
        assert_eq!(summary.low_stock_count, 1);
    }
}
