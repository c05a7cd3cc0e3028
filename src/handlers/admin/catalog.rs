use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{ok, ApiResult};
use crate::models::{Banner, Product, SubscriptionPlan, Term};
use crate::services::admin::{self, BannerInput, ProductInput};
use crate::services::auth;
use crate::services::subscription::{self, PlanInput};
use crate::services::terms::{self, TermInput};
use crate::state::AppState;

// ── Products ──

// GET /api/admin/products
pub async fn list_products(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Product>> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_products(&db, false)?)
}

// POST /api/admin/products
pub async fn create_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ProductInput>,
) -> ApiResult<Product> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(admin::create_product(&db, body)?)
}

// PUT /api/admin/products/:id
pub async fn update_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ProductInput>,
) -> ApiResult<Product> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(admin::update_product(&db, &id, body)?)
}

// DELETE /api/admin/products/:id
pub async fn delete_product(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    if !queries::deactivate_product(&db, &id)? {
        return Err(AppError::not_found("상품을 찾을 수 없습니다"));
    }
    ok(())
}

// ── Banners ──

// GET /api/admin/banners
pub async fn list_banners(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Banner>> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_banners(&db)?)
}

// POST /api/admin/banners
pub async fn create_banner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BannerInput>,
) -> ApiResult<Banner> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(admin::create_banner(&db, body)?)
}

// PUT /api/admin/banners/:id
pub async fn update_banner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<BannerInput>,
) -> ApiResult<Banner> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(admin::update_banner(&db, &id, body)?)
}

// DELETE /api/admin/banners/:id
pub async fn delete_banner(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    if !queries::delete_banner(&db, &id)? {
        return Err(AppError::not_found("배너를 찾을 수 없습니다"));
    }
    ok(())
}

// ── Subscription plans ──

// GET /api/admin/subscription-plans
pub async fn list_plans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<SubscriptionPlan>> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_plans(&db, false)?)
}

// POST /api/admin/subscription-plans
pub async fn create_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PlanInput>,
) -> ApiResult<SubscriptionPlan> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(subscription::create_plan(&db, body)?)
}

// PUT /api/admin/subscription-plans/:id
pub async fn update_plan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<PlanInput>,
) -> ApiResult<SubscriptionPlan> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(subscription::update_plan(&db, &id, body)?)
}

// ── Terms ──

// GET /api/admin/terms
pub async fn list_terms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Term>> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_active_terms(&db)?)
}

// POST /api/admin/terms
pub async fn create_term(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<TermInput>,
) -> ApiResult<Term> {
    auth::require_admin(&state, &headers)?;
    let mut db = state.conn()?;
    let tx = db.transaction()?;
    let term = terms::create_term(&tx, body)?;
    tx.commit()?;
    ok(term)
}
