use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::{ok, ApiResult};
use crate::models::UserCoupon;
use crate::services::coupon::{self, CouponQuote, UserCouponView};
use crate::services::{auth, today};
use crate::state::AppState;

// GET /api/coupons
pub async fn list_coupons(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<UserCouponView>> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(coupon::list_for_user(&db, &user.id, today())?)
}

// POST /api/coupons/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub code: String,
}

pub async fn register_coupon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<UserCoupon> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    let user_coupon = coupon::register_code(&db, &user.id, &body.code, today())?;
    tracing::info!(user_id = %user.id, coupon = %user_coupon.coupon.code, "coupon registered");
    ok(user_coupon)
}

// POST /api/coupons/preview
#[derive(Deserialize)]
pub struct PreviewRequest {
    pub user_coupon_id: String,
    pub amount: i64,
}

pub async fn preview_coupon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<PreviewRequest>,
) -> ApiResult<CouponQuote> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(coupon::preview(&db, &user.id, &body.user_coupon_id, body.amount, today())?)
}
