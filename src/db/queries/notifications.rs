use rusqlite::{params, Connection};

use super::{bool_at, timestamp_at};
use crate::db::TIMESTAMP_FORMAT;
use crate::models::{Notification, NotificationKind};

fn parse_notification_row(row: &rusqlite::Row) -> rusqlite::Result<Notification> {
    let kind_str: String = row.get(2)?;
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: NotificationKind::parse(&kind_str),
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: bool_at(row, 5)?,
        created_at: timestamp_at(row, 6)?,
    })
}

pub fn insert_notification(conn: &Connection, notification: &Notification) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, kind, title, message, is_read, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            notification.id,
            notification.user_id,
            notification.kind.as_str(),
            notification.title,
            notification.message,
            notification.is_read as i32,
            notification.created_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn list_notifications(
    conn: &Connection,
    user_id: &str,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, kind, title, message, is_read, created_at
         FROM notifications WHERE user_id = ?1
         ORDER BY created_at DESC, rowid DESC LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![user_id, limit], parse_notification_row)?;

    let mut notifications = vec![];
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn count_unread_notifications(conn: &Connection, user_id: &str) -> anyhow::Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
        |row| row.get(0),
    )?)
}

pub fn mark_notification_read(conn: &Connection, user_id: &str, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND user_id = ?2",
        params![id, user_id],
    )?;
    Ok(count > 0)
}

pub fn mark_all_notifications_read(conn: &Connection, user_id: &str) -> anyhow::Result<usize> {
    let count = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?;
    Ok(count)
}
