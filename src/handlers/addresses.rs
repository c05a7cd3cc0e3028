use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::{ok, ApiResult};
use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::Address;
use crate::services::address::AddressCandidate;
use crate::services::auth;
use crate::services::format::normalize_phone;
use crate::state::AppState;

// GET /api/addresses
pub async fn list_addresses(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Address>> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_addresses(&db, &user.id)?)
}

// POST /api/addresses
#[derive(Deserialize)]
pub struct AddressRequest {
    pub label: Option<String>,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub zip_code: String,
    pub road_address: String,
    pub detail_address: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

pub async fn create_address(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AddressRequest>,
) -> ApiResult<Address> {
    let user = auth::require_user(&state, &headers)?;

    let recipient_name = body.recipient_name.trim();
    let zip_code = body.zip_code.trim();
    let road_address = body.road_address.trim();
    if recipient_name.is_empty() || zip_code.is_empty() || road_address.is_empty() {
        return Err(AppError::validation("받는 분, 우편번호, 주소를 입력해주세요"));
    }
    let recipient_phone = normalize_phone(&body.recipient_phone)
        .ok_or_else(|| AppError::validation("휴대폰 번호 형식이 올바르지 않습니다"))?;

    let db = state.conn()?;
    // The first address becomes the default.
    let is_default = body.is_default || queries::list_addresses(&db, &user.id)?.is_empty();
    let address = Address {
        id: new_id(),
        user_id: user.id,
        label: body.label.filter(|l| !l.trim().is_empty()),
        recipient_name: recipient_name.to_string(),
        recipient_phone,
        zip_code: zip_code.to_string(),
        road_address: road_address.to_string(),
        detail_address: body.detail_address.filter(|d| !d.trim().is_empty()),
        is_default,
    };
    queries::insert_address(&db, &address)?;
    ok(address)
}

// DELETE /api/addresses/:id
pub async fn delete_address(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<()> {
    let user = auth::require_user(&state, &headers)?;
    let mut db = state.conn()?;
    let tx = db.transaction()?;
    if !queries::delete_address(&tx, &user.id, &id)? {
        return Err(AppError::not_found("배송지를 찾을 수 없습니다"));
    }
    tx.commit()?;
    ok(())
}

// POST /api/addresses/:id/default
pub async fn set_default_address(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Vec<Address>> {
    let user = auth::require_user(&state, &headers)?;
    let mut db = state.conn()?;
    let tx = db.transaction()?;
    if !queries::set_default_address(&tx, &user.id, &id)? {
        return Err(AppError::not_found("배송지를 찾을 수 없습니다"));
    }
    tx.commit()?;
    ok(queries::list_addresses(&db, &user.id)?)
}

// GET /api/address/search?q=
#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search_address(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Vec<AddressCandidate>> {
    let keyword = query.q.as_deref().map(str::trim).unwrap_or("");
    if keyword.chars().count() < 2 {
        return Err(AppError::validation("검색어를 두 글자 이상 입력해주세요"));
    }

    let results = state.address.search(keyword).await.map_err(|e| {
        tracing::error!(error = %e, "address lookup failed");
        AppError::Upstream("주소 검색에 실패했습니다".to_string())
    })?;
    ok(results)
}
