use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use super::{in_transaction, ok, ApiResult};
use crate::db::queries;
use crate::models::{Booking, InsurancePolicy};
use crate::services::booking::{self, NewBooking};
use crate::services::format::booking_status_label;
use crate::services::payment::PaymentView;
use crate::services::{auth, today};
use crate::state::AppState;

#[derive(Serialize)]
pub struct BookingDetail {
    #[serde(flatten)]
    pub booking: Booking,
    pub status_label: &'static str,
    pub payments: Vec<PaymentView>,
    pub insurance: Option<InsurancePolicy>,
}

// GET /api/bookings
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> ApiResult<Vec<Booking>> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    ok(queries::list_bookings_for_user(&db, &user.id)?)
}

// POST /api/bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewBooking>,
) -> ApiResult<Booking> {
    let user = auth::require_user(&state, &headers)?;
    let booking = in_transaction(&state, |conn, outbox| {
        booking::create_booking(conn, &user.id, &body, today(), outbox)
    })?;
    ok(booking)
}

// GET /api/bookings/:id
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<BookingDetail> {
    let user = auth::require_user(&state, &headers)?;
    let db = state.conn()?;
    let booking = booking::get_for_user(&db, &user.id, &id)?;
    ok(BookingDetail {
        status_label: booking_status_label(booking.status),
        payments: queries::list_payments_for_booking(&db, &booking.id)?
            .into_iter()
            .map(PaymentView::from)
            .collect(),
        insurance: queries::get_insurance_for_booking(&db, &booking.id)?,
        booking,
    })
}

// POST /api/bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<Booking> {
    let user = auth::require_user(&state, &headers)?;
    let booking = in_transaction(&state, |conn, outbox| {
        booking::cancel_booking(conn, &id, Some(&user.id), outbox)
    })?;
    ok(booking)
}
