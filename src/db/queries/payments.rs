use rusqlite::{params, Connection, OptionalExtension};

use super::{invalid_column, opt_timestamp_at, timestamp_at};
use crate::db::{now_timestamp, TIMESTAMP_FORMAT};
use crate::models::{Payment, PaymentMethod, PaymentStatus};

const PAYMENT_COLUMNS: &str = "id, booking_id, user_id, method, amount, status, bank_name, account_number, \
     depositor_name, provider_tx_id, paid_at, created_at, updated_at";

fn parse_payment_row(row: &rusqlite::Row) -> rusqlite::Result<Payment> {
    let method_str: String = row.get(3)?;
    let status_str: String = row.get(5)?;

    Ok(Payment {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        user_id: row.get(2)?,
        method: PaymentMethod::parse(&method_str)
            .ok_or_else(|| invalid_column(3, "payment method", &method_str))?,
        amount: row.get(4)?,
        status: PaymentStatus::parse(&status_str)
            .ok_or_else(|| invalid_column(5, "payment status", &status_str))?,
        bank_name: row.get(6)?,
        account_number: row.get(7)?,
        depositor_name: row.get(8)?,
        provider_tx_id: row.get(9)?,
        paid_at: opt_timestamp_at(row, 10)?,
        created_at: timestamp_at(row, 11)?,
        updated_at: timestamp_at(row, 12)?,
    })
}

pub fn insert_payment(conn: &Connection, payment: &Payment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO payments (id, booking_id, user_id, method, amount, status, bank_name, account_number,
                               depositor_name, provider_tx_id, paid_at, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            payment.id,
            payment.booking_id,
            payment.user_id,
            payment.method.as_str(),
            payment.amount,
            payment.status.as_str(),
            payment.bank_name,
            payment.account_number,
            payment.depositor_name,
            payment.provider_tx_id,
            payment.paid_at.map(|t| t.format(TIMESTAMP_FORMAT).to_string()),
            payment.created_at.format(TIMESTAMP_FORMAT).to_string(),
            payment.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_payment(conn: &Connection, id: &str) -> anyhow::Result<Option<Payment>> {
    let payment = conn
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?1"),
            params![id],
            parse_payment_row,
        )
        .optional()?;
    Ok(payment)
}

/// Payments for a booking, newest first.
pub fn list_payments_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<Vec<Payment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PAYMENT_COLUMNS} FROM payments WHERE booking_id = ?1 ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![booking_id], parse_payment_row)?;

    let mut payments = vec![];
    for row in rows {
        payments.push(row?);
    }
    Ok(payments)
}

pub fn update_payment_status(
    conn: &Connection,
    id: &str,
    status: PaymentStatus,
    provider_tx_id: Option<&str>,
) -> anyhow::Result<bool> {
    let now = now_timestamp();
    let paid_at = (status == PaymentStatus::Paid).then(|| now.clone());
    let count = conn.execute(
        "UPDATE payments SET
           status = ?1,
           provider_tx_id = COALESCE(?2, provider_tx_id),
           paid_at = COALESCE(?3, paid_at),
           updated_at = ?4
         WHERE id = ?5",
        params![status.as_str(), provider_tx_id, paid_at, now, id],
    )?;
    Ok(count > 0)
}

pub fn count_pending_bank_transfers(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM payments WHERE method = 'bank_transfer' AND status = 'pending'",
        [],
        |row| row.get(0),
    )?)
}

pub fn total_paid_revenue(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0) FROM payments WHERE status = 'paid'",
        [],
        |row| row.get(0),
    )?)
}
