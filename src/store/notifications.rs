use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis, to_millis};
use crate::error::Result;
use crate::notification::{NotificationRecord, NotificationType};

const NOTIFICATION_COLUMNS: &str = "n.id, n.recipient_id, n.from_user_id, n.kind, n.message, \
     n.is_read, n.reference_id, n.reference_type, n.created_at, u.username AS from_username";

fn row_to_notification(row: &rusqlite::Row) -> rusqlite::Result<NotificationRecord> {
    let kind: String = row.get("kind")?;
    Ok(NotificationRecord {
        id: row.get("id")?,
        recipient_id: row.get("recipient_id")?,
        from_user_id: row.get("from_user_id")?,
        from_username: row.get("from_username")?,
        kind: NotificationType::parse_lenient(&kind),
        message: row.get("message")?,
        is_read: row.get("is_read")?,
        reference_id: row.get("reference_id")?,
        reference_type: row.get("reference_type")?,
        created_at: from_millis(row.get("created_at")?),
    })
}

pub struct InsertNotification<'a> {
    pub recipient_id: i64,
    pub from_user_id: Option<i64>,
    pub kind: NotificationType,
    pub message: &'a str,
    pub reference_id: Option<i64>,
    pub reference_type: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

pub fn insert_notification(conn: &Connection, n: &InsertNotification<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO notifications (recipient_id, from_user_id, kind, message, is_read,
                                    reference_id, reference_type, created_at)
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7)",
        params![
            n.recipient_id,
            n.from_user_id,
            n.kind.as_str(),
            n.message,
            n.reference_id,
            n.reference_type,
            to_millis(n.created_at),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_for_recipient(
    conn: &Connection,
    id: i64,
    recipient_id: i64,
) -> Result<Option<NotificationRecord>> {
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications n
         LEFT JOIN users u ON u.id = n.from_user_id
         WHERE n.id = ?1 AND n.recipient_id = ?2"
    );
    Ok(conn
        .query_row(&sql, params![id, recipient_id], row_to_notification)
        .optional()?)
}

/// Newest first, at most `limit` rows.
pub fn list_for_recipient(
    conn: &Connection,
    recipient_id: i64,
    unread_only: bool,
    limit: usize,
) -> Result<Vec<NotificationRecord>> {
    let filter = if unread_only { "AND n.is_read = 0" } else { "" };
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications n
         LEFT JOIN users u ON u.id = n.from_user_id
         WHERE n.recipient_id = ?1 {filter}
         ORDER BY n.created_at DESC, n.id DESC
         LIMIT ?2"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![recipient_id, limit as i64], row_to_notification)?;
    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row?);
    }
    Ok(notifications)
}

pub fn unread_count(conn: &Connection, recipient_id: i64) -> Result<u64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE recipient_id = ?1 AND is_read = 0",
        params![recipient_id],
        |row| row.get(0),
    )?;
    Ok(count.max(0) as u64)
}

/// Set `is_read` on one row owned by `recipient_id`; false when no such row.
pub fn mark_read(conn: &Connection, id: i64, recipient_id: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND recipient_id = ?2",
        params![id, recipient_id],
    )?;
    Ok(updated > 0)
}

/// Returns the number of rows that flipped from unread.
pub fn mark_all_read(conn: &Connection, recipient_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE recipient_id = ?1 AND is_read = 0",
        params![recipient_id],
    )?)
}

pub fn delete_notification(conn: &Connection, id: i64, recipient_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM notifications WHERE id = ?1 AND recipient_id = ?2",
        params![id, recipient_id],
    )?;
    Ok(deleted > 0)
}
