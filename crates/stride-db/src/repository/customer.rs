//! # Customer Repository
//!
//! Read side of the guest customer records. Rows are written by the order
//! placement transaction (upsert by phone).

use sqlx::SqlitePool;

use crate::error::DbResult;
use crate::repository::{Page, PageRequest};
use stride_core::Customer;

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Customers by most recent activity.
    pub async fn list(&self, page: PageRequest) -> DbResult<Page<Customer>> {
        let total = self.count().await?;

        let items = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, city, postal_code, user_id,
                   order_count, total_spent_cents, created_at, updated_at
            FROM customers
            ORDER BY updated_at DESC, id
            LIMIT ?1 OFFSET ?2
            "#,
        )
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }

    /// Gets a customer by normalized phone.
    pub async fn get_by_phone(&self, phone: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, city, postal_code, user_id,
                   order_count, total_spent_cents, created_at, updated_at
            FROM customers
            WHERE phone = ?1
            "#,
        )
        .bind(phone)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Number of guest customer records.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
