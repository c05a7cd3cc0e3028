//! Phone OTP login, cookie sessions and admin password checks.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::http::{header, HeaderMap};
use base64::Engine;
use chrono::{Duration, NaiveDateTime};
use hmac::{Hmac, Mac};
use rand::{Rng, RngCore};
use rusqlite::Connection;
use sha1::Sha1;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Admin, AdminRole, SessionKind, User};
use crate::state::AppState;

pub const OTP_TTL_SECONDS: i64 = 180;
pub const OTP_RESEND_COOLDOWN_SECONDS: i64 = 30;
pub const OTP_MAX_ATTEMPTS: i64 = 5;
const ADMIN_SESSION_TTL_HOURS: i64 = 12;

// ── OTP ──

fn otp_mac(secret: &str, phone: &str, code: &str) -> Hmac<Sha1> {
    let mut mac = Hmac::<Sha1>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("hmac accepts any key length"));
    mac.update(phone.as_bytes());
    mac.update(b":");
    mac.update(code.as_bytes());
    mac
}

pub fn hash_otp(secret: &str, phone: &str, code: &str) -> String {
    let digest = otp_mac(secret, phone, code).finalize().into_bytes();
    base64::engine::general_purpose::STANDARD.encode(digest)
}

fn otp_matches(secret: &str, phone: &str, code: &str, stored_hash: &str) -> bool {
    let Ok(expected) = base64::engine::general_purpose::STANDARD.decode(stored_hash) else {
        return false;
    };
    otp_mac(secret, phone, code).verify_slice(&expected).is_ok()
}

pub fn generate_otp_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}

/// Stores a fresh code for `phone` and returns it for delivery.
pub fn issue_otp(
    conn: &Connection,
    secret: &str,
    phone: &str,
    now: NaiveDateTime,
) -> Result<String, AppError> {
    if let Some(existing) = queries::get_otp(conn, phone)? {
        let elapsed = (now - existing.created_at).num_seconds();
        if elapsed < OTP_RESEND_COOLDOWN_SECONDS {
            return Err(AppError::RateLimited(format!(
                "{}초 후에 다시 요청해주세요",
                OTP_RESEND_COOLDOWN_SECONDS - elapsed
            )));
        }
    }

    let code = generate_otp_code();
    let expires_at = now + Duration::seconds(OTP_TTL_SECONDS);
    queries::upsert_otp(conn, phone, &hash_otp(secret, phone, &code), &now, &expires_at)?;
    Ok(code)
}

pub fn verify_otp(
    conn: &Connection,
    secret: &str,
    phone: &str,
    code: &str,
    now: NaiveDateTime,
) -> Result<(), AppError> {
    let record = queries::get_otp(conn, phone)?
        .ok_or_else(|| AppError::validation("인증번호를 먼저 요청해주세요"))?;

    if record.expires_at <= now {
        queries::delete_otp(conn, phone)?;
        return Err(AppError::validation("인증번호가 만료되었습니다. 다시 요청해주세요"));
    }

    if record.attempts >= OTP_MAX_ATTEMPTS {
        queries::delete_otp(conn, phone)?;
        return Err(AppError::RateLimited(
            "인증 시도 횟수를 초과했습니다. 다시 요청해주세요".to_string(),
        ));
    }

    if !otp_matches(secret, phone, code.trim(), &record.code_hash) {
        queries::increment_otp_attempts(conn, phone)?;
        return Err(AppError::validation("인증번호가 일치하지 않습니다"));
    }

    queries::delete_otp(conn, phone)?;
    Ok(())
}

pub fn otp_message(code: &str) -> String {
    format!("[칼가는곳] 인증번호 [{code}]를 입력해주세요.")
}

// ── Sessions ──

pub fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

pub fn session_ttl(kind: SessionKind, user_ttl_days: i64) -> Duration {
    match kind {
        SessionKind::User => Duration::days(user_ttl_days),
        SessionKind::Admin => Duration::hours(ADMIN_SESSION_TTL_HOURS),
    }
}

pub fn start_session(
    conn: &Connection,
    subject_id: &str,
    kind: SessionKind,
    ttl: Duration,
    now: NaiveDateTime,
) -> Result<String, AppError> {
    let token = new_session_token();
    queries::create_session(conn, &token, subject_id, kind, &(now + ttl))?;
    Ok(token)
}

pub fn session_cookie(kind: SessionKind, token: &str, ttl: Duration, secure: bool) -> String {
    let mut cookie = format!(
        "{}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        kind.cookie_name(),
        ttl.num_seconds()
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(kind: SessionKind) -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", kind.cookie_name())
}

pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_subject(
    state: &AppState,
    headers: &HeaderMap,
    kind: SessionKind,
) -> Result<String, AppError> {
    let token = cookie_value(headers, kind.cookie_name()).ok_or(AppError::Unauthorized)?;
    let db = state.conn()?;
    queries::get_session_subject(&db, &token, kind)?.ok_or(AppError::Unauthorized)
}

pub fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let user_id = session_subject(state, headers, SessionKind::User)?;
    let db = state.conn()?;
    queries::get_user(&db, &user_id)?.ok_or(AppError::Unauthorized)
}

pub fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Admin, AppError> {
    let admin_id = session_subject(state, headers, SessionKind::Admin)?;
    let db = state.conn()?;
    match queries::get_admin(&db, &admin_id)? {
        Some(admin) if admin.is_active => Ok(admin),
        _ => Err(AppError::Unauthorized),
    }
}

pub fn require_super_admin(state: &AppState, headers: &HeaderMap) -> Result<Admin, AppError> {
    let admin = require_admin(state, headers)?;
    if admin.role != AdminRole::SuperAdmin {
        return Err(AppError::Forbidden("최고 관리자 권한이 필요합니다".to_string()));
    }
    Ok(admin)
}

// ── Admin passwords ──

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to hash password: {e}")))?;
    Ok(hash.to_string())
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

pub fn authenticate_admin(
    conn: &Connection,
    username: &str,
    password: &str,
) -> Result<Admin, AppError> {
    let invalid = || AppError::validation("아이디 또는 비밀번호가 올바르지 않습니다");

    let admin = queries::get_admin_by_username(conn, &username.trim().to_lowercase())?.ok_or_else(invalid)?;
    if !admin.is_active || !verify_password(password, &admin.password_hash) {
        return Err(invalid());
    }

    queries::touch_admin_login(conn, &admin.id)?;
    Ok(admin)
}
