use rusqlite::{params, Connection, OptionalExtension};

use super::{bool_at, date_at, fmt_date, invalid_column, opt_timestamp_at, timestamp_at};
use crate::db::{new_id, now_timestamp};
use crate::models::{Coupon, DiscountType, UserCoupon};

const COUPON_COLUMNS: &str = "c.id, c.code, c.name, c.discount_type, c.discount_value, c.min_order_amount, \
     c.max_discount_amount, c.valid_from, c.valid_until, c.is_active";

/// Reads the ten coupon columns starting at `offset`.
fn parse_coupon_at(row: &rusqlite::Row, offset: usize) -> rusqlite::Result<Coupon> {
    let type_str: String = row.get(offset + 3)?;
    Ok(Coupon {
        id: row.get(offset)?,
        code: row.get(offset + 1)?,
        name: row.get(offset + 2)?,
        discount_type: DiscountType::parse(&type_str)
            .ok_or_else(|| invalid_column(offset + 3, "discount type", &type_str))?,
        discount_value: row.get(offset + 4)?,
        min_order_amount: row.get(offset + 5)?,
        max_discount_amount: row.get(offset + 6)?,
        valid_from: date_at(row, offset + 7)?,
        valid_until: date_at(row, offset + 8)?,
        is_active: bool_at(row, offset + 9)?,
    })
}

// ── Coupons ──

pub fn list_coupons(conn: &Connection) -> anyhow::Result<Vec<Coupon>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons c ORDER BY c.created_at DESC"
    ))?;
    let rows = stmt.query_map([], |row| parse_coupon_at(row, 0))?;

    let mut coupons = vec![];
    for row in rows {
        coupons.push(row?);
    }
    Ok(coupons)
}

pub fn get_coupon(conn: &Connection, id: &str) -> anyhow::Result<Option<Coupon>> {
    let coupon = conn
        .query_row(
            &format!("SELECT {COUPON_COLUMNS} FROM coupons c WHERE c.id = ?1"),
            params![id],
            |row| parse_coupon_at(row, 0),
        )
        .optional()?;
    Ok(coupon)
}

pub fn get_coupon_by_code(conn: &Connection, code: &str) -> anyhow::Result<Option<Coupon>> {
    let coupon = conn
        .query_row(
            &format!("SELECT {COUPON_COLUMNS} FROM coupons c WHERE c.code = ?1"),
            params![code],
            |row| parse_coupon_at(row, 0),
        )
        .optional()?;
    Ok(coupon)
}

pub fn insert_coupon(conn: &Connection, coupon: &Coupon) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO coupons (id, code, name, discount_type, discount_value, min_order_amount,
                              max_discount_amount, valid_from, valid_until, is_active)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            coupon.id,
            coupon.code,
            coupon.name,
            coupon.discount_type.as_str(),
            coupon.discount_value,
            coupon.min_order_amount,
            coupon.max_discount_amount,
            fmt_date(&coupon.valid_from),
            fmt_date(&coupon.valid_until),
            coupon.is_active as i32,
        ],
    )?;
    Ok(())
}

pub fn update_coupon(conn: &Connection, coupon: &Coupon) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE coupons SET
           name = ?1, discount_type = ?2, discount_value = ?3, min_order_amount = ?4,
           max_discount_amount = ?5, valid_from = ?6, valid_until = ?7, is_active = ?8
         WHERE id = ?9",
        params![
            coupon.name,
            coupon.discount_type.as_str(),
            coupon.discount_value,
            coupon.min_order_amount,
            coupon.max_discount_amount,
            fmt_date(&coupon.valid_from),
            fmt_date(&coupon.valid_until),
            coupon.is_active as i32,
            coupon.id,
        ],
    )?;
    Ok(count > 0)
}

// ── User Coupons ──

const USER_COUPON_COLUMNS: &str = "uc.id, uc.user_id, uc.is_used, uc.used_at, uc.booking_id, uc.issued_at";

fn parse_user_coupon_row(row: &rusqlite::Row) -> rusqlite::Result<UserCoupon> {
    Ok(UserCoupon {
        id: row.get(0)?,
        user_id: row.get(1)?,
        is_used: bool_at(row, 2)?,
        used_at: opt_timestamp_at(row, 3)?,
        booking_id: row.get(4)?,
        issued_at: timestamp_at(row, 5)?,
        coupon: parse_coupon_at(row, 6)?,
    })
}

pub fn list_user_coupons(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<UserCoupon>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COUPON_COLUMNS}, {COUPON_COLUMNS}
         FROM user_coupons uc JOIN coupons c ON c.id = uc.coupon_id
         WHERE uc.user_id = ?1
         ORDER BY uc.is_used ASC, c.valid_until ASC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_user_coupon_row)?;

    let mut coupons = vec![];
    for row in rows {
        coupons.push(row?);
    }
    Ok(coupons)
}

pub fn get_user_coupon(conn: &Connection, id: &str) -> anyhow::Result<Option<UserCoupon>> {
    let coupon = conn
        .query_row(
            &format!(
                "SELECT {USER_COUPON_COLUMNS}, {COUPON_COLUMNS}
                 FROM user_coupons uc JOIN coupons c ON c.id = uc.coupon_id
                 WHERE uc.id = ?1"
            ),
            params![id],
            parse_user_coupon_row,
        )
        .optional()?;
    Ok(coupon)
}

pub fn user_has_coupon(conn: &Connection, user_id: &str, coupon_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM user_coupons WHERE user_id = ?1 AND coupon_id = ?2",
        params![user_id, coupon_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

pub fn issue_user_coupon(conn: &Connection, user_id: &str, coupon_id: &str) -> anyhow::Result<String> {
    let id = new_id();
    conn.execute(
        "INSERT INTO user_coupons (id, user_id, coupon_id, issued_at) VALUES (?1, ?2, ?3, ?4)",
        params![id, user_id, coupon_id, now_timestamp()],
    )?;
    Ok(id)
}

/// Marks the coupon used for `booking_id`. Returns false if it was already used.
pub fn mark_user_coupon_used(conn: &Connection, id: &str, booking_id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE user_coupons SET is_used = 1, used_at = ?1, booking_id = ?2 WHERE id = ?3 AND is_used = 0",
        params![now_timestamp(), booking_id, id],
    )?;
    Ok(count > 0)
}

pub fn restore_user_coupon(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE user_coupons SET is_used = 0, used_at = NULL, booking_id = NULL WHERE id = ?1",
        params![id],
    )?;
    Ok(count > 0)
}
