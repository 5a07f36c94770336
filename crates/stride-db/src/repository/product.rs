//! # Product Repository
//!
//! Catalog queries for the storefront and product CRUD for the back office.
//!
//! ## Listing Query
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SELECT … FROM products                                                │
//! │  WHERE is_visible = 1                       (storefront only)          │
//! │    AND (name | brand | description) LIKE %q%  (case-insensitive)       │
//! │    AND brand = ? AND size = ?                                          │
//! │    AND condition_score >= ?                                            │
//! │    AND price_cents BETWEEN ? AND ?                                     │
//! │    AND stock > 0 AND is_featured = 1        (flags)                    │
//! │  ORDER BY <sort>, id                                                   │
//! │  LIMIT ? OFFSET ?                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Filters are appended with `QueryBuilder`, so every value is a bound
//! parameter.

use std::collections::HashMap;

use chrono::Utc;
use serde::Deserialize;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, Page, PageRequest};
use stride_core::{CoreError, Product};

const PRODUCT_COLUMNS: &str = "id, slug, name, brand, size, description, price_cents, \
     original_price_cents, condition_score, condition_label, stock, images, \
     is_visible, is_featured, created_at, updated_at";

// =============================================================================
// Filter Types
// =============================================================================

/// Catalog sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    /// Best condition first.
    Condition,
}

impl ProductSort {
    fn order_by(&self) -> &'static str {
        match self {
            ProductSort::Newest => " ORDER BY created_at DESC, id",
            ProductSort::PriceAsc => " ORDER BY price_cents ASC, created_at DESC, id",
            ProductSort::PriceDesc => " ORDER BY price_cents DESC, created_at DESC, id",
            ProductSort::Condition => " ORDER BY condition_score DESC, created_at DESC, id",
        }
    }
}

/// Catalog filters. Empty strings are treated as absent.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub query: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub min_condition: Option<i64>,
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
    pub in_stock: bool,
    pub featured: bool,
    /// Back office listing: include hidden products.
    pub include_hidden: bool,
    pub sort: ProductSort,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn push_filters<'a>(qb: &mut QueryBuilder<'a, Sqlite>, filter: &ProductFilter) {
    qb.push(" WHERE 1 = 1");

    if !filter.include_hidden {
        qb.push(" AND is_visible = 1");
    }

    if let Some(q) = non_blank(&filter.query) {
        let pattern = like_pattern(q);
        qb.push(" AND (LOWER(name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(brand) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR LOWER(COALESCE(description, '')) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }

    if let Some(brand) = non_blank(&filter.brand) {
        qb.push(" AND LOWER(brand) = LOWER(")
            .push_bind(brand.to_string())
            .push(")");
    }

    if let Some(size) = non_blank(&filter.size) {
        qb.push(" AND LOWER(size) = LOWER(")
            .push_bind(size.to_string())
            .push(")");
    }

    if let Some(min) = filter.min_condition {
        qb.push(" AND condition_score >= ").push_bind(min);
    }

    if let Some(min) = filter.min_price_cents {
        qb.push(" AND price_cents >= ").push_bind(min);
    }

    if let Some(max) = filter.max_price_cents {
        qb.push(" AND price_cents <= ").push_bind(max);
    }

    if filter.in_stock {
        qb.push(" AND stock > 0");
    }

    if filter.featured {
        qb.push(" AND is_featured = 1");
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists products matching `filter`, one page at a time.
    ///
    /// ## Returns
    /// The page of products plus the total number of matches.
    pub async fn list(&self, filter: &ProductFilter, page: PageRequest) -> DbResult<Page<Product>> {
        debug!(?filter, page = page.page, per_page = page.per_page, "Listing products");

        let mut count_qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count_qb, filter);
        let total: i64 = count_qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM products", PRODUCT_COLUMNS));
        push_filters(&mut qb, filter);
        qb.push(filter.sort.order_by());
        qb.push(" LIMIT ")
            .push_bind(page.limit())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let items: Vec<Product> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(Page::new(items, total, page))
    }

    /// Gets a product by slug.
    ///
    /// Hidden products are only returned when `include_hidden` is set.
    pub async fn get_by_slug(&self, slug: &str, include_hidden: bool) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE slug = ?1 AND (is_visible = 1 OR ?2)",
            PRODUCT_COLUMNS
        ))
        .bind(slug)
        .bind(include_hidden)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, visible or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = ?1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Loads the given products keyed by id. Unknown ids are simply absent.
    ///
    /// Used to price a cart in one round trip.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM products WHERE id IN (",
            PRODUCT_COLUMNS
        ));
        let mut separated = qb.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let products: Vec<Product> = qb.build_query_as().fetch_all(&self.pool).await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Distinct brands of visible products, alphabetically.
    pub async fn brands(&self) -> DbResult<Vec<String>> {
        let brands: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT brand FROM products WHERE is_visible = 1 ORDER BY brand COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(brands)
    }

    /// Inserts a new product.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the slug is taken.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, slug = %product.slug, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, slug, name, brand, size, description,
                price_cents, original_price_cents, condition_score, condition_label,
                stock, images, is_visible, is_featured, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.size)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.original_price_cents)
        .bind(product.condition_score)
        .bind(&product.condition_label)
        .bind(product.stock)
        .bind(Json(&product.images))
        .bind(product.is_visible)
        .bind(product.is_featured)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Updates the listing details of an existing product.
    ///
    /// `stock` is not written: checkouts decrement it concurrently, so it
    /// only changes through [`adjust_stock`](Self::adjust_stock) and the
    /// order transactions. `updated_at` is set to now; `created_at` is left
    /// untouched.
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                slug = ?2,
                name = ?3,
                brand = ?4,
                size = ?5,
                description = ?6,
                price_cents = ?7,
                original_price_cents = ?8,
                condition_score = ?9,
                condition_label = ?10,
                images = ?11,
                is_visible = ?12,
                is_featured = ?13,
                updated_at = ?14
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.slug)
        .bind(&product.name)
        .bind(&product.brand)
        .bind(&product.size)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(product.original_price_cents)
        .bind(product.condition_score)
        .bind(&product.condition_label)
        .bind(Json(&product.images))
        .bind(product.is_visible)
        .bind(product.is_featured)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        self.get_by_id(&product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))
    }

    /// Adds `delta` pairs to the shelf (negative to write stock off).
    ///
    /// Applied relative to the current row, so it composes with checkouts
    /// running at the same time.
    ///
    /// ## Errors
    /// - `DbError::NotFound` for an unknown id
    /// - `DbError::Rejected(InsufficientStock)` when the result would be
    ///   negative
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta, "Adjusting stock");

        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?1, updated_at = ?2 WHERE id = ?3 AND stock + ?1 >= 0",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        let product = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if result.rows_affected() == 0 {
            return Err(CoreError::InsufficientStock {
                name: product.name,
                available: product.stock,
                requested: -delta,
            }
            .into());
        }

        Ok(product)
    }

    /// Deletes a product.
    ///
    /// ## Errors
    /// `DbError::ForeignKeyViolation` when reviews still reference it; hide
    /// the product instead.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Gets total product count (including hidden).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use stride_core::types::tests_support::product;

    async fn setup() -> ProductRepository {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products()
    }

    fn shoe(id: &str, brand: &str, price: i64, condition: i64, age_days: i64) -> Product {
        let mut p = product(id, price, 1);
        p.name = format!("{} Runner {}", brand, id);
        p.brand = brand.to_string();
        p.condition_score = condition;
        p.created_at = Utc::now() - Duration::days(age_days);
        p
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = setup().await;
        let p = shoe("a", "Nike", 10_000, 9, 0);
        repo.insert(&p).await.unwrap();

        let found = repo.get_by_slug(&p.slug, false).await.unwrap().unwrap();
        assert_eq!(found.id, "a");
        assert_eq!(found.images, p.images);
        assert!(repo.get_by_slug("nope", false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = setup().await;
        let p = shoe("a", "Nike", 10_000, 9, 0);
        repo.insert(&p).await.unwrap();

        let mut dup = shoe("b", "Nike", 10_000, 9, 0);
        dup.slug = p.slug.clone();
        let err = repo.insert(&dup).await.unwrap_err();
        assert!(err.is_unique_violation_on("slug"));
    }

    #[tokio::test]
    async fn test_hidden_products_excluded_from_storefront() {
        let repo = setup().await;
        let mut hidden = shoe("h", "Adidas", 5_000, 5, 0);
        hidden.is_visible = false;
        repo.insert(&hidden).await.unwrap();
        repo.insert(&shoe("v", "Adidas", 5_000, 5, 0)).await.unwrap();

        let page = repo
            .list(&ProductFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert!(repo.get_by_slug(&hidden.slug, false).await.unwrap().is_none());
        assert!(repo.get_by_slug(&hidden.slug, true).await.unwrap().is_some());

        let filter = ProductFilter {
            include_hidden: true,
            ..Default::default()
        };
        assert_eq!(repo.list(&filter, PageRequest::default()).await.unwrap().total, 2);
    }

    #[tokio::test]
    async fn test_filters_and_sorting() {
        let repo = setup().await;
        repo.insert(&shoe("1", "Nike", 30_000, 9, 3)).await.unwrap();
        repo.insert(&shoe("2", "Nike", 10_000, 6, 2)).await.unwrap();
        repo.insert(&shoe("3", "Adidas", 20_000, 10, 1)).await.unwrap();

        let filter = ProductFilter {
            brand: Some("nike".to_string()),
            ..Default::default()
        };
        let page = repo.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.total, 2);

        let filter = ProductFilter {
            sort: ProductSort::PriceAsc,
            ..Default::default()
        };
        let ids: Vec<_> = repo
            .list(&filter, PageRequest::default())
            .await
            .unwrap()
            .items
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec!["2", "3", "1"]);

        let filter = ProductFilter {
            min_condition: Some(9),
            max_price_cents: Some(25_000),
            ..Default::default()
        };
        let page = repo.list(&filter, PageRequest::default()).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, "3");

        // Newest first by default
        let page = repo
            .list(&ProductFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.items[0].id, "3");
    }

    #[tokio::test]
    async fn test_search_escapes_wildcards() {
        let repo = setup().await;
        repo.insert(&shoe("1", "Nike", 30_000, 9, 0)).await.unwrap();

        let search = |q: &str| ProductFilter {
            query: Some(q.to_string()),
            ..Default::default()
        };
        assert_eq!(repo.list(&search("RUNNER"), PageRequest::default()).await.unwrap().total, 1);
        assert_eq!(repo.list(&search("%"), PageRequest::default()).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_pagination() {
        let repo = setup().await;
        for i in 0..5 {
            repo.insert(&shoe(&i.to_string(), "Vans", 1_000, 7, i)).await.unwrap();
        }

        let page = repo
            .list(&ProductFilter::default(), PageRequest::new(Some(2), Some(2), 24, 60))
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages(), 3);
    }

    #[tokio::test]
    async fn test_get_many_and_brands() {
        let repo = setup().await;
        repo.insert(&shoe("1", "Nike", 1_000, 7, 0)).await.unwrap();
        repo.insert(&shoe("2", "asics", 1_000, 7, 0)).await.unwrap();

        let found = repo
            .get_many(&["1".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("1"));

        assert_eq!(repo.brands().await.unwrap(), vec!["asics", "Nike"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let repo = setup().await;
        let mut p = shoe("1", "Nike", 1_000, 7, 0);
        repo.insert(&p).await.unwrap();

        p.price_cents = 900;
        p.is_featured = true;
        let updated = repo.update(&p).await.unwrap();
        assert_eq!(updated.price_cents, 900);
        assert!(updated.is_featured);

        repo.delete("1").await.unwrap();
        assert!(matches!(
            repo.delete("1").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_concurrent_stock_changes() {
        let repo = setup().await;
        let mut form = product("1", 1_000, 3);
        repo.insert(&form).await.unwrap();

        // A checkout takes a pair after the admin loaded the form
        repo.adjust_stock("1", -1).await.unwrap();

        form.price_cents = 900;
        form.stock = 3;
        let updated = repo.update(&form).await.unwrap();
        assert_eq!(updated.price_cents, 900);
        assert_eq!(updated.stock, 2);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let repo = setup().await;
        repo.insert(&product("1", 1_000, 2)).await.unwrap();

        assert_eq!(repo.adjust_stock("1", 3).await.unwrap().stock, 5);

        let err = repo.adjust_stock("1", -6).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock {
                available: 5,
                requested: 6,
                ..
            })
        ));
        assert_eq!(repo.get_by_id("1").await.unwrap().unwrap().stock, 5);

        assert_eq!(repo.adjust_stock("1", -5).await.unwrap().stock, 0);
        assert!(matches!(
            repo.adjust_stock("missing", 1).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
