//! The order wizard: booking, payment and next step in one transaction.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Booking, InsurancePolicy, Notification, PaymentMethod};
use crate::services::booking::{self, NewBooking};
use crate::services::insurance::InsuranceRequest;
use crate::services::payment::{self, NewPayment, OrderNext, PaymentView};

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentChoice {
    pub method: PaymentMethod,
    pub depositor_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderRequest {
    pub booking: NewBooking,
    pub payment: PaymentChoice,
    pub insurance: Option<InsuranceRequest>,
}

#[derive(Debug, Serialize)]
pub struct OrderReceipt {
    pub booking: Booking,
    pub payment: PaymentView,
    pub insurance: Option<InsurancePolicy>,
    pub next: OrderNext,
}

/// Runs the whole wizard atomically. On error nothing is written. Notifications
/// are returned for publishing once the transaction has committed.
pub fn place_order(
    conn: &mut Connection,
    config: &AppConfig,
    user_id: &str,
    req: OrderRequest,
    today: NaiveDate,
) -> Result<(OrderReceipt, Vec<Notification>), AppError> {
    let mut outbox = vec![];
    let tx = conn.transaction()?;

    let mut booking_req = req.booking;
    if req.insurance.is_some() {
        booking_req.insurance = req.insurance;
    }

    let booking = booking::create_booking(&tx, user_id, &booking_req, today, &mut outbox)?;
    let payment = payment::create_payment(
        &tx,
        config,
        user_id,
        &NewPayment {
            booking_id: booking.id.clone(),
            method: req.payment.method,
            depositor_name: req.payment.depositor_name,
        },
        today,
        &mut outbox,
    )?;
    let insurance = queries::get_insurance_for_booking(&tx, &booking.id)?;
    // Paying can confirm the booking; re-read for the receipt.
    let booking = queries::get_booking(&tx, &booking.id)?.unwrap_or(booking);
    let next = payment::next_step(config, &payment)?;

    tx.commit()?;

    tracing::info!(
        booking_id = %booking.id,
        payment_id = %payment.id,
        method = payment.method.as_str(),
        "order placed"
    );

    Ok((
        OrderReceipt {
            booking,
            payment: payment.into(),
            insurance,
            next,
        },
        outbox,
    ))
}
