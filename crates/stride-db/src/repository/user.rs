//! # User Repository
//!
//! Account storage. Password hashing happens in the API layer; this module
//! only stores the hash.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{Page, PageRequest};
use stride_core::{User, UserRole};

const USER_COLUMNS: &str = "id, email, password_hash, name, phone, role, created_at, updated_at";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Gets a user by (lower-cased) email.
    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE email = ?1",
            USER_COLUMNS
        ))
        .bind(email.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE id = ?1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Inserts a new account.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the email is registered already.
    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(id = %user.id, role = user.role.as_str(), "Inserting user");

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, phone, role, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.phone)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates display name and phone.
    pub async fn update_profile(&self, id: &str, name: &str, phone: Option<&str>) -> DbResult<User> {
        let result = sqlx::query("UPDATE users SET name = ?2, phone = ?3, updated_at = ?4 WHERE id = ?1")
            .bind(id)
            .bind(name)
            .bind(phone)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Makes sure an admin account exists for `email`.
    ///
    /// Creates it with `password_hash` when absent; promotes an existing
    /// customer account. An existing password is never overwritten.
    ///
    /// ## Returns
    /// `true` when something changed.
    pub async fn ensure_admin(&self, email: &str, password_hash: &str, name: &str) -> DbResult<bool> {
        match self.get_by_email(email).await? {
            Some(user) if user.role == UserRole::Admin => Ok(false),
            Some(user) => {
                sqlx::query("UPDATE users SET role = ?2, updated_at = ?3 WHERE id = ?1")
                    .bind(&user.id)
                    .bind(UserRole::Admin)
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await?;
                info!(email = %user.email, "Promoted existing account to admin");
                Ok(true)
            }
            None => {
                let now = Utc::now();
                let admin = User {
                    id: uuid::Uuid::new_v4().to_string(),
                    email: email.trim().to_lowercase(),
                    password_hash: password_hash.to_string(),
                    name: name.to_string(),
                    phone: None,
                    role: UserRole::Admin,
                    created_at: now,
                    updated_at: now,
                };
                self.insert(&admin).await?;
                info!(email = %admin.email, "Created admin account");
                Ok(true)
            }
        }
    }

    /// Accounts, newest first.
    pub async fn list(&self, page: PageRequest) -> DbResult<Page<User>> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY created_at DESC, id LIMIT ?1 OFFSET ?2",
            USER_COLUMNS
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn user(email: &str) -> User {
        let now = Utc::now();
        User {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            name: "Sana".to_string(),
            phone: None,
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert(&user("sana@example.com")).await.unwrap();

        let found = db.users().get_by_email("SANA@example.com").await.unwrap().unwrap();
        assert_eq!(found.password_hash, "hash");
        assert_eq!(found.role, UserRole::Customer);

        let err = db.users().insert(&user("sana@example.com")).await.unwrap_err();
        assert!(err.is_unique_violation_on("email"));
    }

    #[tokio::test]
    async fn test_update_profile() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let u = user("sana@example.com");
        db.users().insert(&u).await.unwrap();

        let updated = db
            .users()
            .update_profile(&u.id, "Sana K", Some("03001112222"))
            .await
            .unwrap();
        assert_eq!(updated.name, "Sana K");
        assert_eq!(updated.phone.as_deref(), Some("03001112222"));
    }

    #[tokio::test]
    async fn test_ensure_admin() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.users().ensure_admin("boss@stride.pk", "h", "Admin").await.unwrap());
        assert!(!db.users().ensure_admin("boss@stride.pk", "h2", "Admin").await.unwrap());

        let admin = db.users().get_by_email("boss@stride.pk").await.unwrap().unwrap();
        assert!(admin.is_admin());
        assert_eq!(admin.password_hash, "h");

        db.users().insert(&user("later@stride.pk")).await.unwrap();
        assert!(db.users().ensure_admin("later@stride.pk", "x", "Admin").await.unwrap());
        assert!(db.users().get_by_email("later@stride.pk").await.unwrap().unwrap().is_admin());
        assert_eq!(db.users().list(PageRequest::default()).await.unwrap().total, 2);
    }
}
