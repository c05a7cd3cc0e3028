use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::handlers::{in_transaction, ok, ApiResult};
use crate::models::{Coupon, NotificationKind, UserCoupon};
use crate::services::coupon::{self, CouponInput};
use crate::services::{admin, auth, notification};
use crate::state::AppState;

// GET /api/admin/coupons
pub async fn list_coupons(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Coupon>> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_coupons(&db)?)
}

// POST /api/admin/coupons
pub async fn create_coupon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CouponInput>,
) -> ApiResult<Coupon> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(coupon::create_coupon(&db, body)?)
}

// PUT /api/admin/coupons/:id
pub async fn update_coupon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<CouponInput>,
) -> ApiResult<Coupon> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(coupon::update_coupon(&db, &id, body)?)
}

// POST /api/admin/coupons/:id/issue
#[derive(Deserialize)]
pub struct IssueRequest {
    pub phone: String,
}

pub async fn issue_coupon(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<IssueRequest>,
) -> ApiResult<UserCoupon> {
    auth::require_admin(&state, &headers)?;
    let user_coupon = in_transaction(&state, |conn, outbox| {
        let user_coupon = admin::issue_coupon_by_phone(conn, &id, &body.phone)?;
        outbox.push(notification::create(
            conn,
            &user_coupon.user_id,
            NotificationKind::Coupon,
            "쿠폰 발급",
            &format!(
                "'{}' 쿠폰이 발급되었습니다. ({})",
                user_coupon.coupon.name,
                coupon::describe(&user_coupon.coupon)
            ),
        )?);
        Ok(user_coupon)
    })?;
    ok(user_coupon)
}
