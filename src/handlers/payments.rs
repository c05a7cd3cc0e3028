use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::{in_transaction, ok, ApiResult};
use crate::db::queries;
use crate::errors::AppError;
use crate::services::order::{self, OrderReceipt, OrderRequest};
use crate::services::payment::{self, NewPayment, OrderNext, PaymentView};
use crate::services::{auth, notification, today};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PaymentReceipt {
    pub payment: PaymentView,
    pub next: OrderNext,
}

// POST /api/payments
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewPayment>,
) -> ApiResult<PaymentReceipt> {
    let user = auth::require_user(&state, &headers)?;
    let payment = in_transaction(&state, |conn, outbox| {
        payment::create_payment(conn, &state.config, &user.id, &body, today(), outbox)
    })?;
    let next = payment::next_step(&state.config, &payment)?;
    ok(PaymentReceipt {
        payment: payment.into(),
        next,
    })
}

// GET /api/payments/:id
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<PaymentView> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    let payment = queries::get_payment(&db, &id)?
        .filter(|p| p.user_id == user.id)
        .ok_or_else(|| AppError::not_found("결제를 찾을 수 없습니다"))?;
    ok(payment.into())
}

// POST /api/orders
pub async fn place_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<OrderRequest>,
) -> ApiResult<OrderReceipt> {
    let user = auth::require_user(&state, &headers)?;
    let (receipt, outbox) = {
        let mut db = state.conn()?;
        order::place_order(&mut db, &state.config, &user.id, body, today())?
    };
    notification::publish(&state, outbox);
    ok(receipt)
}
