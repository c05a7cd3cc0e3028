use rusqlite::{params, Connection, OptionalExtension};

use super::{date_at, fmt_date, invalid_column, timestamp_at};
use crate::db::{now_timestamp, TIMESTAMP_FORMAT};
use crate::models::{Booking, BookingItem, BookingStatus, InsurancePolicy};

const BOOKING_COLUMNS: &str = "id, user_id, booking_date, booking_time, items, total_quantity, total_amount, \
     discount_amount, insurance_premium, final_amount, status, address_id, request_note, user_coupon_id, \
     created_at, updated_at";

fn parse_booking_row(row: &rusqlite::Row) -> rusqlite::Result<Booking> {
    let items_json: String = row.get(4)?;
    let items: Vec<BookingItem> =
        serde_json::from_str(&items_json).map_err(|_| invalid_column(4, "booking items", &items_json))?;
    let status_str: String = row.get(10)?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| invalid_column(10, "booking status", &status_str))?;

    Ok(Booking {
        id: row.get(0)?,
        user_id: row.get(1)?,
        booking_date: date_at(row, 2)?,
        booking_time: row.get(3)?,
        items,
        total_quantity: row.get(5)?,
        total_amount: row.get(6)?,
        discount_amount: row.get(7)?,
        insurance_premium: row.get(8)?,
        final_amount: row.get(9)?,
        status,
        address_id: row.get(11)?,
        request_note: row.get(12)?,
        user_coupon_id: row.get(13)?,
        created_at: timestamp_at(row, 14)?,
        updated_at: timestamp_at(row, 15)?,
    })
}

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    let items_json = serde_json::to_string(&booking.items)?;
    conn.execute(
        "INSERT INTO bookings (id, user_id, booking_date, booking_time, items, total_quantity, total_amount,
                               discount_amount, insurance_premium, final_amount, status, address_id,
                               request_note, user_coupon_id, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            booking.id,
            booking.user_id,
            fmt_date(&booking.booking_date),
            booking.booking_time,
            items_json,
            booking.total_quantity,
            booking.total_amount,
            booking.discount_amount,
            booking.insurance_premium,
            booking.final_amount,
            booking.status.as_str(),
            booking.address_id,
            booking.request_note,
            booking.user_coupon_id,
            booking.created_at.format(TIMESTAMP_FORMAT).to_string(),
            booking.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let booking = conn
        .query_row(
            &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
            params![id],
            parse_booking_row,
        )
        .optional()?;
    Ok(booking)
}

pub fn list_bookings_for_user(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE user_id = ?1 ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn list_bookings(
    conn: &Connection,
    status_filter: Option<BookingStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE status = ?1 ORDER BY created_at DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str().to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!("SELECT {BOOKING_COLUMNS} FROM bookings ORDER BY created_at DESC LIMIT ?1"),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), parse_booking_row)?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row?);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn count_bookings(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM bookings", [], |row| row.get(0))?)
}

// ── Insurance ──

pub fn insert_insurance_policy(conn: &Connection, policy: &InsurancePolicy) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO insurance_policies (id, user_id, booking_id, knife_count, coverage_amount, premium, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            policy.id,
            policy.user_id,
            policy.booking_id,
            policy.knife_count,
            policy.coverage_amount,
            policy.premium,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

pub fn get_insurance_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Option<InsurancePolicy>> {
    let policy = conn
        .query_row(
            "SELECT id, user_id, booking_id, knife_count, coverage_amount, premium
             FROM insurance_policies WHERE booking_id = ?1",
            params![booking_id],
            |row| {
                Ok(InsurancePolicy {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    booking_id: row.get(2)?,
                    knife_count: row.get(3)?,
                    coverage_amount: row.get(4)?,
                    premium: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(policy)
}
