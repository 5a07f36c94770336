//! # Catalog Handlers
//!
//! Public, read-only views of visible products.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use stride_core::validation::validate_search_query;
use stride_core::Review;
use stride_db::{Page, PageRequest, ProductFilter, ProductSort, RatingSummary};

use super::ProductView;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Storefront listing: 24 per page, at most 60.
const DEFAULT_PER_PAGE: i64 = 24;
const MAX_PER_PAGE: i64 = 60;

/// Query string of `GET /api/products`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub q: Option<String>,
    pub brand: Option<String>,
    pub size: Option<String>,
    pub min_condition: Option<i64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub in_stock: Option<bool>,
    pub featured: Option<bool>,
    pub sort: Option<ProductSort>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ProductQuery {
    fn filter(&self) -> ApiResult<ProductFilter> {
        let query = match self.q.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(q) => Some(validate_search_query(q)?),
        };

        Ok(ProductFilter {
            query,
            brand: self.brand.clone(),
            size: self.size.clone(),
            min_condition: self.min_condition,
            min_price_cents: self.min_price,
            max_price_cents: self.max_price,
            in_stock: self.in_stock.unwrap_or(false),
            featured: self.featured.unwrap_or(false),
            include_hidden: false,
            sort: self.sort.unwrap_or_default(),
        })
    }
}

/// `GET /api/products`
pub async fn list_products(
    State(state): State<AppState>,
    query: Result<Query<ProductQuery>, QueryRejection>,
) -> ApiResult<Json<Page<ProductView>>> {
    let Query(query) = query?;
    let filter = query.filter()?;
    let page = PageRequest::new(query.page, query.per_page, DEFAULT_PER_PAGE, MAX_PER_PAGE);

    let products = state.db.products().list(&filter, page).await?;
    debug!(total = products.total, page = products.page, "Catalog listing");

    Ok(Json(products.map(ProductView::from)))
}

/// `GET /api/products/{slug}`
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ProductView>> {
    let product = state
        .db
        .products()
        .get_by_slug(&slug, false)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &slug))?;

    Ok(Json(product.into()))
}

/// `GET /api/brands`
pub async fn list_brands(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.db.products().brands().await?))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReviews {
    pub summary: RatingSummary,
    pub reviews: Vec<PublicReview>,
}

/// A review as shown on the product page. Account and order ids stay private.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicReview {
    pub id: String,
    pub author_name: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<Review> for PublicReview {
    fn from(review: Review) -> Self {
        PublicReview {
            id: review.id,
            author_name: review.author_name,
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
        }
    }
}

/// `GET /api/products/{slug}/reviews`
pub async fn product_reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<ProductReviews>> {
    let product = state
        .db
        .products()
        .get_by_slug(&slug, false)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", &slug))?;

    let reviews = state.db.reviews().list_approved_for_product(&product.id).await?;
    let summary = state.db.reviews().rating_summary(&product.id).await?;

    Ok(Json(ProductReviews {
        summary,
        reviews: reviews.into_iter().map(PublicReview::from).collect(),
    }))
}
