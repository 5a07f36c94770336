//! # Product Management
//!
//! The back office sees hidden products too. Deleting a product that has
//! reviews is refused with 409; hide it instead.
//!
//! Stock is set once on create. After that it only moves by deltas through
//! `PATCH /api/admin/products/{id}/stock`, so an edit form loaded before a
//! checkout cannot put sold pairs back on the shelf.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use stride_core::types::condition_label;
use stride_core::validation::{
    slugify, validate_condition_score, validate_optional_text, validate_price_cents,
    validate_product_name, validate_search_query, validate_slug, validate_stock, validate_text,
    validate_url,
};
use stride_core::{Product, ValidationError};
use stride_db::{Page, PageRequest, ProductFilter, ProductSort};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::ProductView;
use crate::state::AppState;

const MAX_IMAGES: usize = 12;
const MAX_STOCK_DELTA: i64 = 10_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminProductQuery {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub sort: Option<ProductSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create / replace payload. `stock` is required on create and refused on
/// replace.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    /// Generated from name and size when absent.
    pub slug: Option<String>,
    pub brand: String,
    pub size: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub original_price_cents: Option<i64>,
    pub condition_score: i64,
    pub stock: Option<i64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub is_featured: bool,
}

fn default_true() -> bool {
    true
}

/// Stock adjustment payload: pairs added, or removed when negative.
#[derive(Debug, Clone, Deserialize)]
pub struct StockAdjustment {
    pub delta: i64,
}

/// Validated fields, ready to copy onto a [`Product`].
struct ValidProduct {
    name: String,
    slug: Option<String>,
    brand: String,
    size: String,
    description: Option<String>,
    images: Vec<String>,
}

impl ProductInput {
    fn validate(&self) -> ApiResult<ValidProduct> {
        let name = validate_product_name(&self.name)?;
        let brand = validate_text("brand", &self.brand, 80)?;
        let size = validate_text("size", &self.size, 20)?;
        let description = validate_optional_text("description", self.description.as_deref(), 5000)?;
        validate_price_cents("priceCents", self.price_cents)?;
        if let Some(original) = self.original_price_cents {
            validate_price_cents("originalPriceCents", original)?;
        }
        validate_condition_score(self.condition_score)?;
        if let Some(stock) = self.stock {
            validate_stock(stock)?;
        }

        if self.images.len() > MAX_IMAGES {
            return Err(ValidationError::invalid(
                "images",
                format!("at most {} images", MAX_IMAGES),
            )
            .into());
        }
        let images = self
            .images
            .iter()
            .map(|url| validate_url("images", url))
            .collect::<Result<Vec<_>, _>>()?;

        let slug = match self.slug.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(slug) => Some(validate_slug(slug)?),
        };

        Ok(ValidProduct {
            name,
            slug,
            brand,
            size,
            description,
            images,
        })
    }

    fn apply(&self, valid: ValidProduct, product: &mut Product) {
        if let Some(slug) = valid.slug {
            product.slug = slug;
        }
        product.name = valid.name;
        product.brand = valid.brand;
        product.size = valid.size;
        product.description = valid.description;
        product.images = valid.images;
        product.price_cents = self.price_cents;
        product.original_price_cents = self.original_price_cents;
        product.condition_score = self.condition_score;
        product.condition_label = condition_label(self.condition_score).to_string();
        product.is_visible = self.is_visible;
        product.is_featured = self.is_featured;
    }
}

/// Resale listings often share name and size, so generated slugs carry a
/// short random suffix.
fn generated_slug(name: &str, size: &str, id: &str) -> String {
    let suffix: String = id.chars().filter(char::is_ascii_alphanumeric).take(6).collect();
    slugify(&format!("{} {} {}", name, size, suffix))
}

/// `GET /api/admin/products`
pub async fn list(
    _admin: AdminUser,
    State(state): State<AppState>,
    query: Result<Query<AdminProductQuery>, QueryRejection>,
) -> ApiResult<Json<Page<ProductView>>> {
    let Query(query) = query?;
    let search = match query.q.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(q) => Some(validate_search_query(q)?),
    };

    let filter = ProductFilter {
        query: search,
        brand: query.brand.clone(),
        include_hidden: true,
        sort: query.sort.unwrap_or_default(),
        ..Default::default()
    };
    let page = PageRequest::new(query.page, query.per_page, 20, 100);

    let products = state.db.products().list(&filter, page).await?;
    Ok(Json(products.map(ProductView::from)))
}

/// `POST /api/admin/products`
pub async fn create(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProductView>)> {
    let Json(input) = body?;
    let valid = input.validate()?;
    let stock = input.stock.ok_or_else(|| ValidationError::required("stock"))?;

    let now = Utc::now();
    let id = Uuid::new_v4().to_string();
    let slug = valid
        .slug
        .clone()
        .unwrap_or_else(|| generated_slug(&valid.name, &valid.size, &id));

    let mut product = Product {
        id,
        slug,
        name: String::new(),
        brand: String::new(),
        size: String::new(),
        description: None,
        price_cents: 0,
        original_price_cents: None,
        condition_score: 0,
        condition_label: String::new(),
        stock,
        images: Vec::new(),
        is_visible: true,
        is_featured: false,
        created_at: now,
        updated_at: now,
    };
    input.apply(valid, &mut product);

    state.db.products().insert(&product).await?;
    info!(admin_id = %admin.id, product_id = %product.id, slug = %product.slug, "Product created");

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// `PUT /api/admin/products/{id}`
pub async fn update(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> ApiResult<Json<ProductView>> {
    let Json(input) = body?;
    let valid = input.validate()?;
    if input.stock.is_some() {
        return Err(ValidationError::invalid(
            "stock",
            "change stock with PATCH /api/admin/products/{id}/stock",
        )
        .into());
    }

    let mut product = state
        .db
        .products()
        .get_by_id(&id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &id))?;
    input.apply(valid, &mut product);

    let product = state.db.products().update(&product).await?;
    info!(admin_id = %admin.id, product_id = %product.id, "Product updated");

    Ok(Json(product.into()))
}

/// `PATCH /api/admin/products/{id}/stock`
pub async fn adjust_stock(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<StockAdjustment>, JsonRejection>,
) -> ApiResult<Json<ProductView>> {
    let Json(input) = body?;
    if input.delta == 0 {
        return Err(ValidationError::invalid("delta", "must not be zero").into());
    }
    if input.delta.abs() > MAX_STOCK_DELTA {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_STOCK_DELTA,
            max: MAX_STOCK_DELTA,
        }
        .into());
    }

    let product = state.db.products().adjust_stock(&id, input.delta).await?;
    info!(
        admin_id = %admin.id,
        product_id = %product.id,
        delta = input.delta,
        stock = product.stock,
        "Stock adjusted"
    );

    Ok(Json(product.into()))
}

/// `DELETE /api/admin/products/{id}`
pub async fn delete(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.products().delete(&id).await?;
    info!(admin_id = %admin.id, product_id = %id, "Product deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_slug_is_unique_per_id() {
        let a = generated_slug("Air Jordan 1 Mid", "UK 9", "3f2a9c1e-0000");
        let b = generated_slug("Air Jordan 1 Mid", "UK 9", "7b44e0d2-0000");
        assert_eq!(a, "air-jordan-1-mid-uk-9-3f2a9c");
        assert_ne!(a, b);
    }
}
