use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ok, ApiResponse, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{SessionKind, Term, User};
use crate::services::auth;
use crate::services::format::{mask_phone, normalize_phone};
use crate::state::AppState;

fn parse_phone(raw: &str) -> Result<String, AppError> {
    normalize_phone(raw).ok_or_else(|| AppError::validation("휴대폰 번호 형식이 올바르지 않습니다"))
}

// POST /api/auth/otp/send
#[derive(Deserialize)]
pub struct SendOtpRequest {
    pub phone: String,
}

#[derive(Serialize)]
pub struct SendOtpResponse {
    pub expires_in: i64,
}

pub async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SendOtpRequest>,
) -> ApiResult<SendOtpResponse> {
    let phone = parse_phone(&body.phone)?;

    let code = {
        let db = state.conn()?;
        auth::issue_otp(&db, &state.config.otp_secret, &phone, chrono::Utc::now().naive_utc())?
    };

    state
        .sms
        .send_sms(&phone, &auth::otp_message(&code))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, phone = %mask_phone(&phone), "failed to deliver otp");
            AppError::Upstream("인증번호 발송에 실패했습니다".to_string())
        })?;

    tracing::info!(phone = %mask_phone(&phone), "otp sent");
    ok(SendOtpResponse {
        expires_in: auth::OTP_TTL_SECONDS,
    })
}

// POST /api/auth/otp/verify
#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub phone: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub is_new_user: bool,
    pub missing_terms: Vec<Term>,
}

pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AppError> {
    let phone = parse_phone(&body.phone)?;
    let ttl = auth::session_ttl(SessionKind::User, state.config.session_ttl_days);

    let (response, token) = {
        let db = state.conn()?;
        let now = chrono::Utc::now().naive_utc();
        auth::verify_otp(&db, &state.config.otp_secret, &phone, &body.code, now)?;

        let (user, is_new_user) = queries::find_or_create_user(&db, &phone)?;
        let token = auth::start_session(&db, &user.id, SessionKind::User, ttl, now)?;
        let missing_terms = queries::list_missing_required_terms(&db, &user.id)?;
        (
            LoginResponse {
                user,
                is_new_user,
                missing_terms,
            },
            token,
        )
    };

    tracing::info!(user_id = %response.user.id, new = response.is_new_user, "user logged in");
    let cookie = auth::session_cookie(SessionKind::User, &token, ttl, state.config.cookie_secure);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse {
            success: true,
            data: response,
        }),
    ))
}

// GET /api/auth/me
pub async fn me(State(state): State<Arc<AppState>>, headers: HeaderMap) -> ApiResult<User> {
    ok(auth::require_user(&state, &headers)?)
}

// PATCH /api/auth/me
#[derive(Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub async fn update_me(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    let user = auth::require_user(&state, &headers)?;

    let name = body.name.as_deref().map(str::trim).filter(|n| !n.is_empty());
    let email = body.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    if let Some(email) = email {
        if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
            return Err(AppError::validation("이메일 형식이 올바르지 않습니다"));
        }
    }

    let db = state.conn()?;
    queries::update_user_profile(&db, &user.id, name, email)?;
    let user = queries::get_user(&db, &user.id)?.ok_or(AppError::Unauthorized)?;
    ok(user)
}

// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    if let Some(token) = auth::cookie_value(&headers, SessionKind::User.cookie_name()) {
        let db = state.conn()?;
        queries::delete_session(&db, &token)?;
    }
    Ok((
        [(header::SET_COOKIE, auth::clear_session_cookie(SessionKind::User))],
        Json(serde_json::json!({ "success": true, "data": null })),
    ))
}
