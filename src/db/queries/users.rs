use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension};

use super::{bool_at, timestamp_at};
use crate::db::{new_id, now_timestamp, TIMESTAMP_FORMAT};
use crate::models::{Address, SessionKind, User};

// ── Users ──

const USER_COLUMNS: &str = "id, phone, name, email, created_at, updated_at";

fn parse_user_row(row: &rusqlite::Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        phone: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        created_at: timestamp_at(row, 4)?,
        updated_at: timestamp_at(row, 5)?,
    })
}

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

pub fn get_user_by_phone(conn: &Connection, phone: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE phone = ?1"),
            params![phone],
            parse_user_row,
        )
        .optional()?;
    Ok(user)
}

/// Returns the user for `phone`, creating it on first login. The flag is true when created.
pub fn find_or_create_user(conn: &Connection, phone: &str) -> anyhow::Result<(User, bool)> {
    if let Some(user) = get_user_by_phone(conn, phone)? {
        return Ok((user, false));
    }

    let id = new_id();
    let now = now_timestamp();
    conn.execute(
        "INSERT INTO users (id, phone, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        params![id, phone, now],
    )?;

    let user = get_user(conn, &id)?
        .ok_or_else(|| anyhow::anyhow!("user {id} missing after insert"))?;
    Ok((user, true))
}

pub fn update_user_profile(
    conn: &Connection,
    id: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE users SET
           name = COALESCE(?1, name),
           email = COALESCE(?2, email),
           updated_at = ?3
         WHERE id = ?4",
        params![name, email, now_timestamp(), id],
    )?;
    Ok(count > 0)
}

pub fn count_users(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
}

// ── OTP Codes ──

pub struct OtpRecord {
    pub phone: String,
    pub code_hash: String,
    pub attempts: i64,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

pub fn upsert_otp(
    conn: &Connection,
    phone: &str,
    code_hash: &str,
    created_at: &NaiveDateTime,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO otp_codes (phone, code_hash, attempts, expires_at, created_at)
         VALUES (?1, ?2, 0, ?3, ?4)
         ON CONFLICT(phone) DO UPDATE SET
           code_hash = excluded.code_hash,
           attempts = 0,
           expires_at = excluded.expires_at,
           created_at = excluded.created_at",
        params![
            phone,
            code_hash,
            expires_at.format(TIMESTAMP_FORMAT).to_string(),
            created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_otp(conn: &Connection, phone: &str) -> anyhow::Result<Option<OtpRecord>> {
    let record = conn
        .query_row(
            "SELECT phone, code_hash, attempts, expires_at, created_at FROM otp_codes WHERE phone = ?1",
            params![phone],
            |row| {
                Ok(OtpRecord {
                    phone: row.get(0)?,
                    code_hash: row.get(1)?,
                    attempts: row.get(2)?,
                    expires_at: timestamp_at(row, 3)?,
                    created_at: timestamp_at(row, 4)?,
                })
            },
        )
        .optional()?;
    Ok(record)
}

pub fn increment_otp_attempts(conn: &Connection, phone: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE otp_codes SET attempts = attempts + 1 WHERE phone = ?1",
        params![phone],
    )?;
    Ok(())
}

pub fn delete_otp(conn: &Connection, phone: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM otp_codes WHERE phone = ?1", params![phone])?;
    Ok(())
}

// ── Sessions ──

pub fn create_session(
    conn: &Connection,
    token: &str,
    subject_id: &str,
    kind: SessionKind,
    expires_at: &NaiveDateTime,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO sessions (token, subject_id, kind, expires_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            token,
            subject_id,
            kind.as_str(),
            expires_at.format(TIMESTAMP_FORMAT).to_string(),
            now_timestamp()
        ],
    )?;
    Ok(())
}

/// Subject id of an unexpired session of the given kind.
pub fn get_session_subject(
    conn: &Connection,
    token: &str,
    kind: SessionKind,
) -> anyhow::Result<Option<String>> {
    let subject = conn
        .query_row(
            "SELECT subject_id FROM sessions WHERE token = ?1 AND kind = ?2 AND expires_at > ?3",
            params![token, kind.as_str(), now_timestamp()],
            |row| row.get(0),
        )
        .optional()?;
    Ok(subject)
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<()> {
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

pub fn delete_sessions_for_subject(conn: &Connection, subject_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute("DELETE FROM sessions WHERE subject_id = ?1", params![subject_id])?;
    Ok(count)
}

pub fn expire_old_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let count = conn.execute(
        "DELETE FROM sessions WHERE expires_at <= ?1",
        params![now_timestamp()],
    )?;
    Ok(count)
}

// ── Addresses ──

const ADDRESS_COLUMNS: &str = "id, user_id, label, recipient_name, recipient_phone, zip_code, road_address, detail_address, is_default";

fn parse_address_row(row: &rusqlite::Row) -> rusqlite::Result<Address> {
    Ok(Address {
        id: row.get(0)?,
        user_id: row.get(1)?,
        label: row.get(2)?,
        recipient_name: row.get(3)?,
        recipient_phone: row.get(4)?,
        zip_code: row.get(5)?,
        road_address: row.get(6)?,
        detail_address: row.get(7)?,
        is_default: bool_at(row, 8)?,
    })
}

pub fn list_addresses(conn: &Connection, user_id: &str) -> anyhow::Result<Vec<Address>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = ?1 ORDER BY is_default DESC, created_at DESC"
    ))?;
    let rows = stmt.query_map(params![user_id], parse_address_row)?;

    let mut addresses = vec![];
    for row in rows {
        addresses.push(row?);
    }
    Ok(addresses)
}

pub fn get_address(conn: &Connection, id: &str) -> anyhow::Result<Option<Address>> {
    let address = conn
        .query_row(
            &format!("SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = ?1"),
            params![id],
            parse_address_row,
        )
        .optional()?;
    Ok(address)
}

pub fn insert_address(conn: &Connection, address: &Address) -> anyhow::Result<()> {
    if address.is_default {
        clear_default_address(conn, &address.user_id)?;
    }
    conn.execute(
        "INSERT INTO addresses (id, user_id, label, recipient_name, recipient_phone, zip_code, road_address, detail_address, is_default)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            address.id,
            address.user_id,
            address.label,
            address.recipient_name,
            address.recipient_phone,
            address.zip_code,
            address.road_address,
            address.detail_address,
            address.is_default as i32,
        ],
    )?;
    Ok(())
}

fn clear_default_address(conn: &Connection, user_id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE addresses SET is_default = 0 WHERE user_id = ?1",
        params![user_id],
    )?;
    Ok(())
}

pub fn set_default_address(conn: &Connection, user_id: &str, id: &str) -> anyhow::Result<bool> {
    clear_default_address(conn, user_id)?;
    let count = conn.execute(
        "UPDATE addresses SET is_default = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn delete_address(conn: &Connection, user_id: &str, id: &str) -> anyhow::Result<bool> {
    // Bookings keep pointing at the row; detach them first.
    conn.execute(
        "UPDATE bookings SET address_id = NULL WHERE address_id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    let count = conn.execute(
        "DELETE FROM addresses WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}
