use rusqlite::{params, Connection, OptionalExtension};

use super::{bool_at, opt_timestamp_at};
use crate::db::now_timestamp;
use crate::models::{Admin, AdminRole};

const ADMIN_COLUMNS: &str = "id, username, password_hash, name, role, is_active, last_login_at";

fn parse_admin_row(row: &rusqlite::Row) -> rusqlite::Result<Admin> {
    let role_str: String = row.get(4)?;
    Ok(Admin {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        name: row.get(3)?,
        role: AdminRole::parse(&role_str),
        is_active: bool_at(row, 5)?,
        last_login_at: opt_timestamp_at(row, 6)?,
    })
}

pub fn get_admin(conn: &Connection, id: &str) -> anyhow::Result<Option<Admin>> {
    let admin = conn
        .query_row(
            &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = ?1"),
            params![id],
            parse_admin_row,
        )
        .optional()?;
    Ok(admin)
}

pub fn get_admin_by_username(conn: &Connection, username: &str) -> anyhow::Result<Option<Admin>> {
    let admin = conn
        .query_row(
            &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE username = ?1"),
            params![username],
            parse_admin_row,
        )
        .optional()?;
    Ok(admin)
}

pub fn list_admins(conn: &Connection) -> anyhow::Result<Vec<Admin>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ADMIN_COLUMNS} FROM admins ORDER BY created_at ASC"
    ))?;
    let rows = stmt.query_map([], parse_admin_row)?;

    let mut admins = vec![];
    for row in rows {
        admins.push(row?);
    }
    Ok(admins)
}

pub fn count_admins(conn: &Connection) -> anyhow::Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?)
}

pub fn insert_admin(conn: &Connection, admin: &Admin) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO admins (id, username, password_hash, name, role, is_active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            admin.id,
            admin.username,
            admin.password_hash,
            admin.name,
            admin.role.as_str(),
            admin.is_active as i32,
            now_timestamp(),
        ],
    )?;
    Ok(())
}

pub fn set_admin_active(conn: &Connection, id: &str, active: bool) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE admins SET is_active = ?1 WHERE id = ?2",
        params![active as i32, id],
    )?;
    Ok(count > 0)
}

pub fn touch_admin_login(conn: &Connection, id: &str) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE admins SET last_login_at = ?1 WHERE id = ?2",
        params![now_timestamp(), id],
    )?;
    Ok(())
}
