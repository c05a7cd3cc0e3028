use rusqlite::Connection;

use crate::db::{new_id, queries};
use crate::errors::AppError;
use crate::models::{Notification, NotificationKind};
use crate::state::AppState;

/// Writes a notification row. Callers inside a transaction collect the result
/// and hand it to [`publish`] after commit.
pub fn create(
    conn: &Connection,
    user_id: &str,
    kind: NotificationKind,
    title: &str,
    message: &str,
) -> anyhow::Result<Notification> {
    let notification = Notification {
        id: new_id(),
        user_id: user_id.to_string(),
        kind,
        title: title.to_string(),
        message: message.to_string(),
        is_read: false,
        created_at: chrono::Utc::now().naive_utc(),
    };
    queries::insert_notification(conn, &notification)?;
    Ok(notification)
}

/// Fans committed notifications out to live subscribers.
pub fn publish(state: &AppState, notifications: Vec<Notification>) {
    for notification in notifications {
        // No receivers is fine: nobody has the stream open.
        let _ = state.notifications_tx.send(notification);
    }
}

pub fn mark_read(conn: &Connection, user_id: &str, id: &str) -> Result<(), AppError> {
    if !queries::mark_notification_read(conn, user_id, id)? {
        return Err(AppError::not_found("알림을 찾을 수 없습니다"));
    }
    Ok(())
}
