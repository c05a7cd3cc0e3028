use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::{in_transaction, ok, ApiResult};
use crate::models::{Booking, BookingStatus, InsurancePolicy, PaymentMethod, PaymentStatus, User};
use crate::services::payment::{self, PaymentView};
use crate::services::{auth, booking};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;

// GET /api/admin/orders?status=&limit=
#[derive(Deserialize)]
pub struct OrdersQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OrdersQuery>,
) -> ApiResult<Vec<Booking>> {
    auth::require_admin(&state, &headers)?;

    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Some(
            BookingStatus::parse(s).ok_or_else(|| AppError::validation(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 500);

    let db = state.conn()?;
    ok(queries::list_bookings(&db, status, limit)?)
}

// GET /api/admin/orders/:id
#[derive(Serialize)]
pub struct OrderDetail {
    pub booking: Booking,
    pub payments: Vec<PaymentView>,
    pub user: Option<User>,
    pub insurance: Option<InsurancePolicy>,
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<OrderDetail> {
    auth::require_admin(&state, &headers)?;
    let db = state.conn()?;
    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::not_found("예약을 찾을 수 없습니다"))?;
    ok(OrderDetail {
        payments: queries::list_payments_for_booking(&db, &booking.id)?
            .into_iter()
            .map(PaymentView::from)
            .collect(),
        user: queries::get_user(&db, &booking.user_id)?,
        insurance: queries::get_insurance_for_booking(&db, &booking.id)?,
        booking,
    })
}

// POST /api/admin/orders/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: BookingStatus,
}

pub async fn update_order_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> ApiResult<Booking> {
    let admin = auth::require_admin(&state, &headers)?;
    let booking = in_transaction(&state, |conn, outbox| {
        booking::update_status(conn, &id, body.status, outbox)
    })?;
    tracing::info!(by = %admin.username, booking_id = %booking.id, status = booking.status.as_str(), "order status updated");
    ok(booking)
}

// POST /api/admin/payments/:id/confirm
/// Marks a bank transfer as received.
pub async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<PaymentView> {
    let admin = auth::require_admin(&state, &headers)?;
    let payment = in_transaction(&state, |conn, outbox| {
        let existing = queries::get_payment(conn, &id)?
            .ok_or_else(|| AppError::not_found("결제를 찾을 수 없습니다"))?;
        if existing.method != PaymentMethod::BankTransfer {
            return Err(AppError::validation("무통장입금 결제만 수동으로 확인할 수 있습니다"));
        }
        if existing.status != PaymentStatus::Pending {
            return Err(AppError::conflict("입금 대기 중인 결제가 아닙니다"));
        }
        payment::transition(conn, &id, PaymentStatus::Paid, None, outbox)
    })?;
    tracing::info!(by = %admin.username, payment_id = %payment.id, "bank transfer confirmed");
    ok(payment.into())
}

// POST /api/admin/payments/:id/refund
pub async fn refund_payment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<PaymentView> {
    let admin = auth::require_admin(&state, &headers)?;
    let payment = in_transaction(&state, |conn, outbox| {
        let existing = queries::get_payment(conn, &id)?
            .ok_or_else(|| AppError::not_found("결제를 찾을 수 없습니다"))?;
        if existing.status != PaymentStatus::Paid {
            return Err(AppError::conflict("결제 완료된 건만 환불할 수 있습니다"));
        }
        payment::transition(conn, &id, PaymentStatus::Refunded, None, outbox)
    })?;
    tracing::info!(by = %admin.username, payment_id = %payment.id, "payment refunded");
    ok(payment.into())
}
