//! # Voucher Repository
//!
//! Voucher lookup for checkout and CRUD for the back office. Redemption
//! (`used_count + 1`) lives in the order placement transaction.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stride_core::voucher::normalize_code;
use stride_core::Voucher;

const VOUCHER_COLUMNS: &str = "id, code, description, discount_type, value, min_order_cents, \
     max_discount_cents, usage_limit, used_count, is_active, expires_at, created_at, updated_at";

/// Repository for voucher database operations.
#[derive(Debug, Clone)]
pub struct VoucherRepository {
    pool: SqlitePool,
}

impl VoucherRepository {
    /// Creates a new VoucherRepository.
    pub fn new(pool: SqlitePool) -> Self {
        VoucherRepository { pool }
    }

    /// Looks a voucher up by code. The code is normalized first.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Voucher>> {
        let code = normalize_code(code);
        debug!(code = %code, "Looking up voucher");

        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {} FROM vouchers WHERE code = ?1",
            VOUCHER_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// Gets a voucher by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Voucher>> {
        let voucher = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {} FROM vouchers WHERE id = ?1",
            VOUCHER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(voucher)
    }

    /// All vouchers, newest first.
    pub async fn list(&self) -> DbResult<Vec<Voucher>> {
        let vouchers = sqlx::query_as::<_, Voucher>(&format!(
            "SELECT {} FROM vouchers ORDER BY created_at DESC, id",
            VOUCHER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(vouchers)
    }

    /// Inserts a voucher.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the code is taken.
    pub async fn insert(&self, voucher: &Voucher) -> DbResult<()> {
        debug!(id = %voucher.id, code = %voucher.code, "Inserting voucher");

        sqlx::query(
            r#"
            INSERT INTO vouchers (
                id, code, description, discount_type, value, min_order_cents,
                max_discount_cents, usage_limit, used_count, is_active, expires_at,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(&voucher.description)
        .bind(voucher.discount_type)
        .bind(voucher.value)
        .bind(voucher.min_order_cents)
        .bind(voucher.max_discount_cents)
        .bind(voucher.usage_limit)
        .bind(voucher.used_count)
        .bind(voucher.is_active)
        .bind(voucher.expires_at)
        .bind(voucher.created_at)
        .bind(voucher.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the editable fields. `used_count` is never written here so an
    /// edit cannot undo concurrent redemptions.
    pub async fn update(&self, voucher: &Voucher) -> DbResult<Voucher> {
        debug!(id = %voucher.id, "Updating voucher");

        let result = sqlx::query(
            r#"
            UPDATE vouchers SET
                code = ?2,
                description = ?3,
                discount_type = ?4,
                value = ?5,
                min_order_cents = ?6,
                max_discount_cents = ?7,
                usage_limit = ?8,
                is_active = ?9,
                expires_at = ?10,
                updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&voucher.id)
        .bind(&voucher.code)
        .bind(&voucher.description)
        .bind(voucher.discount_type)
        .bind(voucher.value)
        .bind(voucher.min_order_cents)
        .bind(voucher.max_discount_cents)
        .bind(voucher.usage_limit)
        .bind(voucher.is_active)
        .bind(voucher.expires_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", &voucher.id));
        }

        self.get_by_id(&voucher.id)
            .await?
            .ok_or_else(|| DbError::not_found("Voucher", &voucher.id))
    }

    /// Deletes a voucher. Orders keep the code as plain text.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting voucher");

        let result = sqlx::query("DELETE FROM vouchers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Voucher", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use stride_core::DiscountType;

    fn voucher(code: &str) -> Voucher {
        let now = Utc::now();
        Voucher {
            id: format!("id-{}", code),
            code: code.to_string(),
            description: Some("Eid sale".to_string()),
            discount_type: DiscountType::Percentage,
            value: 15,
            min_order_cents: 500_000,
            max_discount_cents: Some(150_000),
            usage_limit: Some(100),
            used_count: 0,
            is_active: true,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().insert(&voucher("EID15")).await.unwrap();

        let found = db.vouchers().get_by_code("  eid15 ").await.unwrap().unwrap();
        assert_eq!(found.discount_type, DiscountType::Percentage);
        assert_eq!(found.max_discount_cents, Some(150_000));
        assert!(db.vouchers().get_by_code("NOPE").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.vouchers().insert(&voucher("EID15")).await.unwrap();

        let mut dup = voucher("EID15");
        dup.id = "other".to_string();
        let err = db.vouchers().insert(&dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("code"));
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut v = voucher("EID15");
        db.vouchers().insert(&v).await.unwrap();

        v.is_active = false;
        v.value = 20;
        let updated = db.vouchers().update(&v).await.unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.value, 20);

        db.vouchers().delete(&v.id).await.unwrap();
        assert!(db.vouchers().list().await.unwrap().is_empty());
        assert!(matches!(
            db.vouchers().delete(&v.id).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
