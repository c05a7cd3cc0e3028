use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use super::{ok, ApiResult};
use crate::db::queries;
use crate::models::Term;
use crate::services::{auth, terms};
use crate::state::AppState;

// GET /api/terms
pub async fn list_terms(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Term>> {
    let db = state.conn()?;
    ok(queries::list_active_terms(&db)?)
}

// POST /api/terms/agree
#[derive(Deserialize)]
pub struct AgreeRequest {
    pub term_ids: Vec<String>,
}

/// Responds with the required terms still missing after recording the agreement.
pub async fn agree(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<AgreeRequest>,
) -> ApiResult<Vec<Term>> {
    let user = auth::require_user(&state, &headers)?;
    let mut db = state.conn()?;
    let tx = db.transaction()?;
    let missing = terms::agree(&tx, &user.id, &body.term_ids)?;
    tx.commit()?;
    ok(missing)
}

// GET /api/terms/missing
pub async fn missing_terms(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Term>> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_missing_required_terms(&db, &user.id)?)
}
