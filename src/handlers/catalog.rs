//! Public, unauthenticated reads: catalog, banners, plans and the insurance quote.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Banner, Product, SubscriptionPlan};
use crate::services::format::format_currency;
use crate::services::insurance::{self, PremiumQuote};
use crate::services::today;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub discount_rate: i64,
    pub price_label: String,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            discount_rate: product.discount_rate(),
            price_label: format_currency(product.discount_price),
            product,
        }
    }
}

// GET /api/products
pub async fn list_products(State(state): State<Arc<AppState>>) -> ApiResult<Vec<ProductView>> {
    let db = state.conn()?;
    let products = queries::list_products(&db, true)?;
    ok(products.into_iter().map(ProductView::from).collect())
}

// GET /api/products/:id
pub async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<ProductView> {
    let db = state.conn()?;
    let product = queries::get_product(&db, &id)?
        .filter(|p| p.is_active)
        .ok_or_else(|| AppError::not_found("상품을 찾을 수 없습니다"))?;
    ok(product.into())
}

// GET /api/banners
pub async fn list_banners(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Banner>> {
    let today = today();
    let db = state.conn()?;
    let banners = queries::list_banners(&db)?
        .into_iter()
        .filter(|b| b.is_visible_on(today))
        .collect();
    ok(banners)
}

// GET /api/subscription-plans
pub async fn list_plans(State(state): State<Arc<AppState>>) -> ApiResult<Vec<SubscriptionPlan>> {
    let db = state.conn()?;
    ok(queries::list_plans(&db, true)?)
}

// POST /api/insurance/quote
#[derive(Deserialize)]
pub struct QuoteRequest {
    pub coverage_amount: i64,
    pub knife_count: i64,
}

pub async fn insurance_quote(Json(body): Json<QuoteRequest>) -> ApiResult<PremiumQuote> {
    ok(insurance::calculate_premium(body.coverage_amount, body.knife_count)?)
}
