//! # Order Repository
//!
//! Order placement and the back-office status workflow.
//!
//! ## Placement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │   1. per line: UPDATE products SET stock = stock - qty                 │
//! │                WHERE id = ? AND is_visible = 1 AND stock >= qty        │
//! │                (0 rows → InsufficientStock / unavailable, ROLLBACK)    │
//! │   2. voucher:  UPDATE vouchers SET used_count = used_count + 1         │
//! │                WHERE id = ? AND is_active = 1                          │
//! │                  AND (usage_limit IS NULL OR used_count < usage_limit) │
//! │                (0 rows → UsageExhausted, ROLLBACK)                     │
//! │   3. customers: upsert by phone, bump order_count / total_spent        │
//! │   4. orders:   INSERT … status = 'pending'                             │
//! │                (order_number collision → ROLLBACK, retry with new #)   │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Status Update Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │   UPDATE orders SET status = next, <stamp>_at = now                    │
//! │          WHERE order_number = ? AND status IN (statuses that may       │
//! │                                                move to next)           │
//! │          (0 rows → OrderNotFound / InvalidStatusTransition)            │
//! │   load order ─► next ∈ {cancelled, returned} ─► stock += qty per line  │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Both transactions write before they read. A deferred SQLite transaction
//! that reads first cannot upgrade to a writer once another connection
//! has committed (`SQLITE_BUSY_SNAPSHOT`, not retried by the busy timeout);
//! one whose first statement writes simply waits for the lock.

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, Page, PageRequest};
use stride_core::order::generate_order_number;
use stride_core::{
    AppliedVoucher, CoreError, Order, OrderItem, OrderStatus, OrderTotals, PaymentMethod,
    VoucherRejection,
};

const ORDER_COLUMNS: &str = "id, order_number, user_id, customer_id, customer_name, email, \
     phone, address, city, postal_code, notes, payment_method, payment_proof_url, items, \
     subtotal_cents, delivery_fee_cents, discount_cents, voucher_code, total_cents, status, \
     tracking_number, courier, created_at, updated_at, confirmed_at, shipped_at, \
     delivered_at, cancelled_at";

/// How many fresh order numbers to try before giving up.
pub const MAX_ORDER_NUMBER_ATTEMPTS: usize = 5;

// =============================================================================
// Input Types
// =============================================================================

/// Validated shipping details. `phone` is already normalized to digits.
#[derive(Debug, Clone)]
pub struct ShippingDetails {
    pub customer_name: String,
    pub email: Option<String>,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub postal_code: Option<String>,
    pub notes: Option<String>,
}

/// Everything needed to persist an order. Totals were computed server-side.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<String>,
    pub shipping: ShippingDetails,
    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub items: Vec<OrderItem>,
    pub totals: OrderTotals,
    pub voucher: Option<AppliedVoucher>,
}

/// Back-office order listing filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matches order number, customer name or phone.
    pub query: Option<String>,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Places an order in one transaction, retrying on order-number
    /// collisions.
    ///
    /// ## Errors
    /// - `DbError::Rejected(InsufficientStock | ProductUnavailable | ProductNotFound)`
    ///   when a line lost its stock to a concurrent checkout
    /// - `DbError::Rejected(VoucherRejected(UsageExhausted))` when the
    ///   voucher hit its cap concurrently
    pub async fn place_order(&self, new_order: &NewOrder) -> DbResult<Order> {
        self.place_order_numbered(new_order, new_order_number).await
    }

    /// `place_order` with the order number source supplied by the caller.
    async fn place_order_numbered(
        &self,
        new_order: &NewOrder,
        mut next_number: impl FnMut() -> String,
    ) -> DbResult<Order> {
        for attempt in 1..=MAX_ORDER_NUMBER_ATTEMPTS {
            let order_number = next_number();

            match self.try_place_order(new_order, &order_number).await {
                Err(err) if err.is_unique_violation_on("order_number") => {
                    warn!(attempt, order_number = %order_number, "Order number collision, retrying");
                }
                Ok(order) => {
                    info!(
                        order_number = %order.order_number,
                        total_cents = order.total_cents,
                        items = order.items.len(),
                        voucher = ?order.voucher_code,
                        "Order placed"
                    );
                    return Ok(order);
                }
                Err(err) => return Err(err),
            }
        }

        Err(DbError::Internal(format!(
            "could not allocate a unique order number after {} attempts",
            MAX_ORDER_NUMBER_ATTEMPTS
        )))
    }

    async fn try_place_order(&self, new_order: &NewOrder, order_number: &str) -> DbResult<Order> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        for item in &new_order.items {
            reserve_stock(&mut tx, item, now).await?;
        }

        if let Some(voucher) = &new_order.voucher {
            redeem_voucher(&mut tx, voucher, now).await?;
        }

        let customer_id = upsert_customer(&mut tx, new_order, now).await?;

        let order = Order {
            id: generate_order_id(),
            order_number: order_number.to_string(),
            user_id: new_order.user_id.clone(),
            customer_id,
            customer_name: new_order.shipping.customer_name.clone(),
            email: new_order.shipping.email.clone(),
            phone: new_order.shipping.phone.clone(),
            address: new_order.shipping.address.clone(),
            city: new_order.shipping.city.clone(),
            postal_code: new_order.shipping.postal_code.clone(),
            notes: new_order.shipping.notes.clone(),
            payment_method: new_order.payment_method,
            payment_proof_url: new_order.payment_proof_url.clone(),
            items: new_order.items.clone(),
            subtotal_cents: new_order.totals.subtotal.cents(),
            delivery_fee_cents: new_order.totals.delivery_fee.cents(),
            discount_cents: new_order.totals.discount.cents(),
            voucher_code: new_order.voucher.as_ref().map(|v| v.code.clone()),
            total_cents: new_order.totals.total.cents(),
            status: OrderStatus::Pending,
            tracking_number: None,
            courier: None,
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
        };

        insert_order(&mut tx, &order).await?;
        tx.commit().await?;

        Ok(order)
    }

    /// Gets an order by its human-readable number.
    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_number = ?1",
            ORDER_COLUMNS
        ))
        .bind(order_number.trim().to_uppercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Orders placed by an account, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE user_id = ?1 ORDER BY created_at DESC, id",
            ORDER_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    /// Back-office listing, newest first.
    pub async fn list(&self, filter: &OrderFilter, page: PageRequest) -> DbResult<Page<Order>> {
        debug!(?filter, page = page.page, "Listing orders");

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM orders");
        push_order_filters(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM orders", ORDER_COLUMNS));
        push_order_filters(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());
        let items: Vec<Order> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    /// Moves an order to `next`, enforcing the lifecycle.
    ///
    /// Entering `cancelled` or `returned` puts every line's quantity back on
    /// the shelf in the same transaction.
    ///
    /// ## Errors
    /// - `DbError::Rejected(OrderNotFound)` for an unknown number
    /// - `DbError::Rejected(InvalidStatusTransition)` when the current status
    ///   cannot move to `next`
    pub async fn update_status(&self, order_number: &str, next: OrderStatus) -> DbResult<Order> {
        let now = Utc::now();
        let order_number = order_number.trim().to_uppercase();
        let from: Vec<OrderStatus> = OrderStatus::ALL
            .into_iter()
            .filter(|status| status.can_transition_to(next))
            .collect();

        let mut tx = self.pool.begin().await?;

        let moved = if from.is_empty() {
            false
        } else {
            let mut qb = QueryBuilder::<Sqlite>::new("UPDATE orders SET status = ");
            qb.push_bind(next).push(", updated_at = ").push_bind(now);
            if let Some(column) = stamp_column(next) {
                qb.push(format!(", {} = ", column)).push_bind(now);
            }
            qb.push(" WHERE order_number = ")
                .push_bind(order_number.clone())
                .push(" AND status IN (");
            let mut statuses = qb.separated(", ");
            for status in &from {
                statuses.push_bind(*status);
            }
            statuses.push_unseparated(")");

            qb.build().execute(&mut *tx).await?.rows_affected() == 1
        };

        if !moved {
            // Explain why the guard failed.
            let current: Option<OrderStatus> =
                sqlx::query_scalar("SELECT status FROM orders WHERE order_number = ?1")
                    .bind(&order_number)
                    .fetch_optional(&mut *tx)
                    .await?;

            let err = match current {
                None => CoreError::OrderNotFound(order_number),
                Some(status) => CoreError::InvalidStatusTransition {
                    from: status,
                    to: next,
                },
            };
            return Err(err.into());
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE order_number = ?1",
            ORDER_COLUMNS
        ))
        .bind(&order_number)
        .fetch_one(&mut *tx)
        .await?;

        if next.restocks() {
            for item in &order.items {
                restore_stock(&mut tx, item, now).await?;
            }
        }

        tx.commit().await?;

        info!(
            order_number = %order_number,
            to = %next,
            restocked = next.restocks(),
            "Order status changed"
        );

        Ok(order)
    }

    /// Sets tracking number and courier; blank values clear them.
    pub async fn update_tracking(
        &self,
        order_number: &str,
        tracking_number: Option<&str>,
        courier: Option<&str>,
    ) -> DbResult<Order> {
        let order_number = order_number.trim().to_uppercase();
        debug!(order_number = %order_number, "Updating tracking");

        let result = sqlx::query(
            "UPDATE orders SET tracking_number = ?1, courier = ?2, updated_at = ?3 WHERE order_number = ?4",
        )
        .bind(tracking_number)
        .bind(courier)
        .bind(Utc::now())
        .bind(&order_number)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::OrderNotFound(order_number).into());
        }

        self.get_by_number(&order_number)
            .await?
            .ok_or_else(|| DbError::not_found("Order", order_number))
    }
}

// =============================================================================
// Transaction Steps
// =============================================================================

/// Fresh order number from today's date and a random UUID.
fn new_order_number() -> String {
    generate_order_number(Utc::now(), uuid::Uuid::new_v4().as_u128())
}

fn generate_order_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Timestamp column stamped when an order enters `status`.
fn stamp_column(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::Confirmed => Some("confirmed_at"),
        OrderStatus::Shipped => Some("shipped_at"),
        OrderStatus::Delivered => Some("delivered_at"),
        OrderStatus::Cancelled => Some("cancelled_at"),
        OrderStatus::Pending | OrderStatus::Processing | OrderStatus::Returned => None,
    }
}

fn push_order_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &OrderFilter) {
    qb.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }

    if let Some(q) = filter.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        let pattern = like_pattern(q);
        qb.push(" AND (LOWER(order_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(customer_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR phone LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// Guarded stock decrement for one line.
async fn reserve_stock(
    conn: &mut SqliteConnection,
    item: &OrderItem,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?1, updated_at = ?2
        WHERE id = ?3 AND is_visible = 1 AND stock >= ?1
        "#,
    )
    .bind(item.quantity)
    .bind(now)
    .bind(&item.product_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 1 {
        return Ok(());
    }

    // Explain why the guard failed.
    let row: Option<(String, i64, bool)> =
        sqlx::query_as("SELECT name, stock, is_visible FROM products WHERE id = ?1")
            .bind(&item.product_id)
            .fetch_optional(&mut *conn)
            .await?;

    let err = match row {
        None => CoreError::ProductNotFound(item.product_id.clone()),
        Some((name, _, false)) => CoreError::ProductUnavailable { name },
        Some((name, stock, true)) => CoreError::InsufficientStock {
            name,
            available: stock,
            requested: item.quantity,
        },
    };
    warn!(product_id = %item.product_id, error = %err, "Stock reservation failed");

    Err(err.into())
}

/// Puts a line's quantity back. A product deleted since is skipped.
async fn restore_stock(
    conn: &mut SqliteConnection,
    item: &OrderItem,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3")
        .bind(item.quantity)
        .bind(now)
        .bind(&item.product_id)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        debug!(product_id = %item.product_id, "Restock skipped, product no longer exists");
    }

    Ok(())
}

/// Guarded `used_count + 1`.
async fn redeem_voucher(
    conn: &mut SqliteConnection,
    voucher: &AppliedVoucher,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE vouchers
        SET used_count = used_count + 1, updated_at = ?1
        WHERE id = ?2
          AND is_active = 1
          AND (usage_limit IS NULL OR used_count < usage_limit)
        "#,
    )
    .bind(now)
    .bind(&voucher.voucher_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        warn!(code = %voucher.code, "Voucher redemption lost the race");
        return Err(CoreError::VoucherRejected(VoucherRejection::UsageExhausted).into());
    }

    debug!(code = %voucher.code, "Voucher redeemed");
    Ok(())
}

/// Inserts or refreshes the guest customer for this phone.
///
/// ## Returns
/// The customer id (existing or new).
async fn upsert_customer(
    conn: &mut SqliteConnection,
    new_order: &NewOrder,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let shipping = &new_order.shipping;

    let id: String = sqlx::query_scalar(
        r#"
        INSERT INTO customers (
            id, name, email, phone, address, city, postal_code, user_id,
            order_count, total_spent_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?9, ?10, ?10)
        ON CONFLICT (phone) DO UPDATE SET
            name = excluded.name,
            email = COALESCE(excluded.email, customers.email),
            address = excluded.address,
            city = excluded.city,
            postal_code = COALESCE(excluded.postal_code, customers.postal_code),
            user_id = COALESCE(excluded.user_id, customers.user_id),
            order_count = customers.order_count + 1,
            total_spent_cents = customers.total_spent_cents + excluded.total_spent_cents,
            updated_at = excluded.updated_at
        RETURNING id
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&shipping.customer_name)
    .bind(&shipping.email)
    .bind(&shipping.phone)
    .bind(&shipping.address)
    .bind(&shipping.city)
    .bind(&shipping.postal_code)
    .bind(&new_order.user_id)
    .bind(new_order.totals.total.cents())
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn insert_order(conn: &mut SqliteConnection, order: &Order) -> DbResult<()> {
    debug!(order_number = %order.order_number, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO orders (
            id, order_number, user_id, customer_id,
            customer_name, email, phone, address, city, postal_code, notes,
            payment_method, payment_proof_url, items,
            subtotal_cents, delivery_fee_cents, discount_cents, voucher_code, total_cents,
            status, tracking_number, courier,
            created_at, updated_at, confirmed_at, shipped_at, delivered_at, cancelled_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8, ?9, ?10, ?11,
            ?12, ?13, ?14,
            ?15, ?16, ?17, ?18, ?19,
            ?20, ?21, ?22,
            ?23, ?24, ?25, ?26, ?27, ?28
        )
        "#,
    )
    .bind(&order.id)
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(&order.customer_id)
    .bind(&order.customer_name)
    .bind(&order.email)
    .bind(&order.phone)
    .bind(&order.address)
    .bind(&order.city)
    .bind(&order.postal_code)
    .bind(&order.notes)
    .bind(order.payment_method)
    .bind(&order.payment_proof_url)
    .bind(Json(&order.items))
    .bind(order.subtotal_cents)
    .bind(order.delivery_fee_cents)
    .bind(order.discount_cents)
    .bind(&order.voucher_code)
    .bind(order.total_cents)
    .bind(order.status)
    .bind(&order.tracking_number)
    .bind(&order.courier)
    .bind(order.created_at)
    .bind(order.updated_at)
    .bind(order.confirmed_at)
    .bind(order.shipped_at)
    .bind(order.delivered_at)
    .bind(order.cancelled_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stride_core::types::tests_support::product;
    use stride_core::{DiscountType, Money, Voucher};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn item_for(p: &stride_core::Product, qty: i64) -> OrderItem {
        OrderItem {
            product_id: p.id.clone(),
            slug: p.slug.clone(),
            name: p.name.clone(),
            brand: p.brand.clone(),
            size: p.size.clone(),
            condition_score: p.condition_score,
            image: None,
            unit_price_cents: p.price_cents,
            quantity: qty,
            line_total_cents: p.price_cents * qty,
        }
    }

    fn new_order(items: Vec<OrderItem>, voucher: Option<AppliedVoucher>) -> NewOrder {
        let subtotal: Money = items.iter().map(OrderItem::line_total).sum();
        let discount = voucher.as_ref().map(|v| v.discount()).unwrap_or_default();
        NewOrder {
            user_id: None,
            shipping: ShippingDetails {
                customer_name: "Bilal".to_string(),
                email: None,
                phone: "03001234567".to_string(),
                address: "House 1, Street 2".to_string(),
                city: "Lahore".to_string(),
                postal_code: None,
                notes: None,
            },
            payment_method: PaymentMethod::CashOnDelivery,
            payment_proof_url: None,
            items,
            totals: OrderTotals::compute(subtotal, Money::from_cents(250), discount),
            voucher,
        }
    }

    async fn insert_voucher(db: &Database, usage_limit: Option<i64>) -> Voucher {
        let now = Utc::now();
        let voucher = Voucher {
            id: "v1".to_string(),
            code: "ONCE".to_string(),
            description: None,
            discount_type: DiscountType::Fixed,
            value: 100,
            min_order_cents: 0,
            max_discount_cents: None,
            usage_limit,
            used_count: 0,
            is_active: true,
            expires_at: None,
            created_at: now,
            updated_at: now,
        };
        db.vouchers().insert(&voucher).await.unwrap();
        voucher
    }

    fn applied(voucher: &Voucher) -> AppliedVoucher {
        AppliedVoucher {
            voucher_id: voucher.id.clone(),
            code: voucher.code.clone(),
            discount_type: voucher.discount_type,
            discount_cents: voucher.value,
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock() {
        let db = setup().await;
        let p = product("p1", 10_000, 2);
        db.products().insert(&p).await.unwrap();

        let order = db
            .orders()
            .place_order(&new_order(vec![item_for(&p, 2)], None))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert!(order.order_number.starts_with("STR-"));
        assert_eq!(order.total_cents, 20_250);

        let stored = db.orders().get_by_number(&order.order_number).await.unwrap().unwrap();
        assert_eq!(stored.items, order.items);
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_place_order_insufficient_stock_rolls_back() {
        let db = setup().await;
        let a = product("a", 10_000, 5);
        let b = product("b", 10_000, 1);
        db.products().insert(&a).await.unwrap();
        db.products().insert(&b).await.unwrap();

        let err = db
            .orders()
            .place_order(&new_order(vec![item_for(&a, 2), item_for(&b, 2)], None))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock { available: 1, .. })
        ));

        // First line's decrement was rolled back
        assert_eq!(db.products().get_by_id("a").await.unwrap().unwrap().stock, 5);
        assert_eq!(db.customers().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_voucher_usage_cap_is_atomic() {
        let db = setup().await;
        let p = product("p1", 10_000, 5);
        db.products().insert(&p).await.unwrap();
        let voucher = insert_voucher(&db, Some(1)).await;

        let first = new_order(vec![item_for(&p, 1)], Some(applied(&voucher)));
        db.orders().place_order(&first).await.unwrap();

        let second = new_order(vec![item_for(&p, 1)], Some(applied(&voucher)));
        let err = db.orders().place_order(&second).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::VoucherRejected(VoucherRejection::UsageExhausted))
        ));

        let stored = db.vouchers().get_by_code("ONCE").await.unwrap().unwrap();
        assert_eq!(stored.used_count, 1);
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 4);
    }

    #[tokio::test]
    async fn test_customer_upserted_by_phone() {
        let db = setup().await;
        let p = product("p1", 1_000, 5);
        db.products().insert(&p).await.unwrap();

        let first = db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();
        let second = db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();
        assert_eq!(first.customer_id, second.customer_id);
        assert_ne!(first.order_number, second.order_number);

        let customers = db.customers().list(PageRequest::default()).await.unwrap();
        assert_eq!(customers.total, 1);
        assert_eq!(customers.items[0].order_count, 2);
        assert_eq!(customers.items[0].total_spent_cents, 2 * 1_250);
    }

    #[tokio::test]
    async fn test_status_workflow_and_timestamps() {
        let db = setup().await;
        let p = product("p1", 1_000, 1);
        db.products().insert(&p).await.unwrap();
        let order = db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();
        let number = order.order_number.as_str();

        let confirmed = db.orders().update_status(number, OrderStatus::Confirmed).await.unwrap();
        assert!(confirmed.confirmed_at.is_some());

        let err = db.orders().update_status(number, OrderStatus::Delivered).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InvalidStatusTransition { .. })
        ));

        db.orders().update_status(number, OrderStatus::Processing).await.unwrap();
        db.orders().update_status(number, OrderStatus::Shipped).await.unwrap();
        let delivered = db.orders().update_status(number, OrderStatus::Delivered).await.unwrap();
        assert!(delivered.delivered_at.is_some());

        let stored = db.orders().get_by_number(number).await.unwrap().unwrap();
        assert_eq!(stored.status, OrderStatus::Delivered);
        assert!(stored.shipped_at.is_some());
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_once() {
        let db = setup().await;
        let p = product("p1", 1_000, 3);
        db.products().insert(&p).await.unwrap();
        let order = db.orders().place_order(&new_order(vec![item_for(&p, 2)], None)).await.unwrap();
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 1);

        let cancelled = db
            .orders()
            .update_status(&order.order_number, OrderStatus::Cancelled)
            .await
            .unwrap();
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 3);

        // Terminal: a second cancel is refused and does not restock again
        assert!(db
            .orders()
            .update_status(&order.order_number, OrderStatus::Cancelled)
            .await
            .is_err());
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_update_status_unknown_order() {
        let db = setup().await;
        let err = db
            .orders()
            .update_status("STR-000000-AAAAAA", OrderStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::OrderNotFound(_))));
    }

    #[tokio::test]
    async fn test_tracking_and_listing() {
        let db = setup().await;
        let p = product("p1", 1_000, 5);
        db.products().insert(&p).await.unwrap();
        let order = db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();
        db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();

        let tracked = db
            .orders()
            .update_tracking(&order.order_number.to_lowercase(), Some("TCS-123"), Some("TCS"))
            .await
            .unwrap();
        assert_eq!(tracked.tracking_number.as_deref(), Some("TCS-123"));

        db.orders()
            .update_status(&order.order_number, OrderStatus::Confirmed)
            .await
            .unwrap();

        let filter = OrderFilter {
            status: Some(OrderStatus::Pending),
            ..Default::default()
        };
        let page = db.orders().list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 1);

        let all = db.orders().list(&OrderFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn test_order_number_collision_retries_with_fresh_number() {
        let db = setup().await;
        let p = product("p1", 1_000, 5);
        db.products().insert(&p).await.unwrap();

        let first = db
            .orders()
            .place_order_numbered(&new_order(vec![item_for(&p, 1)], None), || {
                "STR-260101-AAAAAA".to_string()
            })
            .await
            .unwrap();
        assert_eq!(first.order_number, "STR-260101-AAAAAA");

        let mut numbers = vec!["STR-260101-BBBBBB", "STR-260101-AAAAAA"];
        let second = db
            .orders()
            .place_order_numbered(&new_order(vec![item_for(&p, 1)], None), || {
                numbers.pop().unwrap_or_default().to_string()
            })
            .await
            .unwrap();
        assert_eq!(second.order_number, "STR-260101-BBBBBB");

        // The clashing attempt rolled back its reservation
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 3);
        let all = db.orders().list(&OrderFilter::default(), PageRequest::default()).await.unwrap();
        assert_eq!(all.total, 2);
    }

    #[tokio::test]
    async fn test_order_number_attempts_are_bounded() {
        let db = setup().await;
        let p = product("p1", 1_000, 5);
        db.products().insert(&p).await.unwrap();
        db.orders()
            .place_order_numbered(&new_order(vec![item_for(&p, 1)], None), || {
                "STR-260101-AAAAAA".to_string()
            })
            .await
            .unwrap();

        let mut calls = 0;
        let err = db
            .orders()
            .place_order_numbered(&new_order(vec![item_for(&p, 1)], None), || {
                calls += 1;
                "STR-260101-AAAAAA".to_string()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Internal(_)));
        assert_eq!(calls, MAX_ORDER_NUMBER_ATTEMPTS);
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 4);
        assert_eq!(db.customers().list(PageRequest::default()).await.unwrap().items[0].order_count, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_status_updates_on_file_database() {
        let path = std::env::temp_dir().join(format!("stride-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(path.clone()).max_connections(5)).await.unwrap();

        let p = product("p1", 1_000, 100);
        db.products().insert(&p).await.unwrap();

        let mut numbers = Vec::new();
        for _ in 0..20 {
            let order = db
                .orders()
                .place_order(&new_order(vec![item_for(&p, 1)], None))
                .await
                .unwrap();
            numbers.push(order.order_number);
        }

        let mut confirms = Vec::new();
        for number in numbers.clone() {
            let db = db.clone();
            confirms.push(tokio::spawn(async move {
                db.orders().update_status(&number, OrderStatus::Confirmed).await
            }));
        }
        let mut checkouts = Vec::new();
        for _ in 0..10 {
            let db = db.clone();
            let order = new_order(vec![item_for(&p, 1)], None);
            checkouts.push(tokio::spawn(async move { db.orders().place_order(&order).await }));
        }

        for handle in confirms {
            let order = handle.await.unwrap().unwrap();
            assert_eq!(order.status, OrderStatus::Confirmed);
        }
        for handle in checkouts {
            handle.await.unwrap().unwrap();
        }

        // Cancels race with each other and with restocking
        let mut cancels = Vec::new();
        for number in numbers {
            let db = db.clone();
            cancels.push(tokio::spawn(async move {
                db.orders().update_status(&number, OrderStatus::Cancelled).await
            }));
        }
        for handle in cancels {
            handle.await.unwrap().unwrap();
        }

        // 100 - 20 placed - 10 placed + 20 restored
        assert_eq!(db.products().get_by_id("p1").await.unwrap().unwrap().stock, 90);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    #[tokio::test]
    async fn test_order_search_treats_wildcards_literally() {
        let db = setup().await;
        let p = product("p1", 1_000, 5);
        db.products().insert(&p).await.unwrap();
        db.orders().place_order(&new_order(vec![item_for(&p, 1)], None)).await.unwrap();

        let search = |q: &str| OrderFilter {
            query: Some(q.to_string()),
            ..Default::default()
        };

        let hit = db.orders().list(&search("bil"), PageRequest::default()).await.unwrap();
        assert_eq!(hit.total, 1);

        for q in ["%", "_", "bi_al"] {
            let page = db.orders().list(&search(q), PageRequest::default()).await.unwrap();
            assert_eq!(page.total, 0, "query {:?}", q);
        }
    }
}
