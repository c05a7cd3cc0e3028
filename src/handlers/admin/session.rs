use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{ok, ApiResponse, ApiResult};
use crate::models::{Admin, SessionKind};
use crate::services::admin::{self, NewAdmin};
use crate::services::auth;
use crate::services::dashboard::{self, DashboardStats};
use crate::services::today;
use crate::state::AppState;

// POST /api/admin/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let ttl = auth::session_ttl(SessionKind::Admin, state.config.session_ttl_days);
    let (admin, token) = {
        let db = state.conn()?;
        let admin = auth::authenticate_admin(&db, &body.username, &body.password)?;
        let token = auth::start_session(&db, &admin.id, SessionKind::Admin, ttl, chrono::Utc::now().naive_utc())?;
        (admin, token)
    };

    tracing::info!(admin = %admin.username, "admin logged in");
    let cookie = auth::session_cookie(SessionKind::Admin, &token, ttl, state.config.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse {
            success: true,
            data: admin,
        }),
    ))
}

// POST /api/admin/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = auth::cookie_value(&headers, SessionKind::Admin.cookie_name()) {
        let db = state.conn()?;
        queries::delete_session(&db, &token)?;
    }
    Ok((
        [(header::SET_COOKIE, auth::clear_session_cookie(SessionKind::Admin))],
        Json(serde_json::json!({ "success": true, "data": null })),
    ))
}

// GET /api/admin/me
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<Admin> {
    ok(auth::require_admin(&state, &headers)?)
}

// GET /api/admin/dashboard
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<DashboardStats> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(dashboard::build(&db, today())?)
}

// GET /api/admin/admins
pub async fn list_admins(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Admin>> {
    auth::require_super_admin(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_admins(&db)?)
}

// POST /api/admin/admins
pub async fn create_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewAdmin>,
) -> ApiResult<Admin> {
    let acting = auth::require_super_admin(&state, &headers)?;
    let db = state.conn()?;
    let admin = admin::create_admin(&db, body)?;
    tracing::info!(by = %acting.username, username = %admin.username, "admin account created");
    ok(admin)
}

// DELETE /api/admin/admins/:id
pub async fn deactivate_admin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let acting = auth::require_super_admin(&state, &headers)?;
    let db = state.conn()?;
    admin::deactivate_admin(&db, &acting, &id)?;
    tracing::info!(by = %acting.username, admin_id = %id, "admin account deactivated");
    ok(())
}
