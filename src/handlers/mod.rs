pub mod account;
pub mod addresses;
pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod coupons;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod subscriptions;
pub mod terms;
pub mod webhook;

use axum::Json;
use rusqlite::Connection;
use serde::Serialize;

use crate::errors::AppError;
use crate::models::Notification;
use crate::services::notification;
use crate::state::AppState;

/// Success envelope; failures are rendered by [`AppError`].
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse { success: true, data }))
}

/// Runs `f` in one transaction and publishes the notifications it queued once committed.
pub fn in_transaction<T>(
    state: &AppState,
    f: impl FnOnce(&Connection, &mut Vec<Notification>) -> Result<T, AppError>,
) -> Result<T, AppError> {
    let mut outbox = vec![];
    let value = {
        let mut db = state.conn()?;
        let tx = db.transaction()?;
        let value = f(&tx, &mut outbox)?;
        tx.commit()?;
        value
    };
    notification::publish(state, outbox);
    Ok(value)
}
