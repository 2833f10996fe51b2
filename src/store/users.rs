use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis, to_millis};
use crate::error::Result;
use crate::user::UserRecord;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, created_at";

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        created_at: from_millis(row.get("created_at")?),
    })
}

pub fn insert_user(
    conn: &Connection,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![username, email, first_name, last_name, to_millis(now)],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_user).optional()?)
}

pub fn get_by_username(conn: &Connection, username: &str) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1");
    Ok(conn
        .query_row(&sql, params![username], row_to_user)
        .optional()?)
}

pub fn get_by_email(conn: &Connection, email: &str) -> Result<Option<UserRecord>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE");
    Ok(conn.query_row(&sql, params![email], row_to_user).optional()?)
}

pub fn get_by_username_or_email(conn: &Connection, value: &str) -> Result<Option<UserRecord>> {
    if let Some(user) = get_by_username(conn, value)? {
        return Ok(Some(user));
    }
    get_by_email(conn, value)
}

/// Users whose username or name contains `query`, best matches first so
/// `limit` never cuts an exact or prefix match in favor of a substring one.
pub fn search_users(
    conn: &Connection,
    query: &str,
    exclude_id: i64,
    limit: usize,
) -> Result<Vec<UserRecord>> {
    let escaped = escape_like(query);
    let contains = format!("%{escaped}%");
    let prefix = format!("{escaped}%");
    let sql = format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE id <> ?1
           AND (username LIKE ?2 ESCAPE '\\'
                OR first_name LIKE ?2 ESCAPE '\\'
                OR last_name LIKE ?2 ESCAPE '\\')
         ORDER BY
           CASE
             WHEN lower(username) = lower(?4) THEN 0
             WHEN username LIKE ?5 ESCAPE '\\' THEN 1
             WHEN lower(first_name) = lower(?4) OR lower(last_name) = lower(?4) THEN 2
             WHEN first_name LIKE ?5 ESCAPE '\\' OR last_name LIKE ?5 ESCAPE '\\' THEN 3
             ELSE 4
           END,
           username ASC
         LIMIT ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![exclude_id, contains, limit as i64, query, prefix],
        row_to_user,
    )?;
    let mut users = Vec::new();
    for row in rows {
        users.push(row?);
    }
    Ok(users)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
