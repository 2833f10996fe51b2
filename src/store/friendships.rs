use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis, to_millis};
use crate::error::Result;
use crate::friend::{FriendshipRecord, FriendshipStatus};

const FRIENDSHIP_COLUMNS: &str =
    "id, requester_id, addressee_id, status, created_at, updated_at";

fn row_to_friendship(row: &rusqlite::Row) -> rusqlite::Result<FriendshipRecord> {
    let status: String = row.get("status")?;
    Ok(FriendshipRecord {
        id: row.get("id")?,
        requester_id: row.get("requester_id")?,
        addressee_id: row.get("addressee_id")?,
        status: FriendshipStatus::parse_lenient(&status),
        created_at: from_millis(row.get("created_at")?),
        updated_at: from_millis(row.get("updated_at")?),
    })
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<FriendshipRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_friendship)?;
    let mut friendships = Vec::new();
    for row in rows {
        friendships.push(row?);
    }
    Ok(friendships)
}

pub fn get_friendship(conn: &Connection, id: i64) -> Result<Option<FriendshipRecord>> {
    let sql = format!("SELECT {FRIENDSHIP_COLUMNS} FROM friendships WHERE id = ?1");
    Ok(conn
        .query_row(&sql, params![id], row_to_friendship)
        .optional()?)
}

/// The row for the unordered pair `{a, b}`, in either direction.
pub fn find_between(conn: &Connection, a: i64, b: i64) -> Result<Option<FriendshipRecord>> {
    let sql = format!(
        "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
         WHERE (requester_id = ?1 AND addressee_id = ?2)
            OR (requester_id = ?2 AND addressee_id = ?1)"
    );
    Ok(conn
        .query_row(&sql, params![a, b], row_to_friendship)
        .optional()?)
}

pub fn insert_pending(
    conn: &Connection,
    requester_id: i64,
    addressee_id: i64,
    now: DateTime<Utc>,
) -> Result<i64> {
    let ts = to_millis(now);
    conn.execute(
        "INSERT INTO friendships (requester_id, addressee_id, status, created_at, updated_at)
         VALUES (?1, ?2, 'pending', ?3, ?3)",
        params![requester_id, addressee_id, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Move a pending row addressed to `addressee_id` to `status`.
///
/// Returns false when no such pending row exists.
pub fn resolve_pending(
    conn: &Connection,
    id: i64,
    addressee_id: i64,
    status: FriendshipStatus,
    now: DateTime<Utc>,
) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE friendships SET status = ?3, updated_at = ?4
         WHERE id = ?1 AND addressee_id = ?2 AND status = 'pending'",
        params![id, addressee_id, status.as_str(), to_millis(now)],
    )?;
    Ok(updated > 0)
}

pub fn delete_friendship(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM friendships WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

/// Accepted rows where `user_id` is either party, newest first.
pub fn list_accepted(conn: &Connection, user_id: i64) -> Result<Vec<FriendshipRecord>> {
    let sql = format!(
        "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
         WHERE status = 'accepted' AND (requester_id = ?1 OR addressee_id = ?1)
         ORDER BY updated_at DESC, id DESC"
    );
    collect(conn, &sql, params![user_id])
}

pub fn list_incoming(conn: &Connection, user_id: i64) -> Result<Vec<FriendshipRecord>> {
    let sql = format!(
        "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
         WHERE status = 'pending' AND addressee_id = ?1
         ORDER BY created_at DESC, id DESC"
    );
    collect(conn, &sql, params![user_id])
}

pub fn list_sent(conn: &Connection, user_id: i64) -> Result<Vec<FriendshipRecord>> {
    let sql = format!(
        "SELECT {FRIENDSHIP_COLUMNS} FROM friendships
         WHERE status = 'pending' AND requester_id = ?1
         ORDER BY created_at DESC, id DESC"
    );
    collect(conn, &sql, params![user_id])
}
