use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use super::{in_transaction, ok, ApiResult};
use crate::errors::AppError;
use crate::models::PaymentStatus;
use crate::services::payment::{self, WebhookEvent};
use crate::state::AppState;

#[derive(Serialize)]
pub struct WebhookAck {
    pub payment_id: String,
    pub status: PaymentStatus,
}

// POST /webhook/payments
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<WebhookAck> {
    // Skipped when PAYMENT_WEBHOOK_SECRET is empty (dev mode)
    let signature = headers.get("x-signature").and_then(|v| v.to_str().ok());
    if !payment::verify_webhook_signature(&state.config.payment_webhook_secret, &body, signature) {
        tracing::warn!("rejected payment webhook with invalid signature");
        return Err(AppError::Forbidden("invalid signature".to_string()));
    }

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::validation(format!("invalid webhook payload: {e}")))?;

    tracing::info!(
        payment_id = %event.payment_id,
        status = event.status.as_str(),
        "payment webhook received"
    );

    let payment = in_transaction(&state, |conn, outbox| payment::apply_webhook(conn, &event, outbox))?;
    ok(WebhookAck {
        payment_id: payment.id,
        status: payment.status,
    })
}
