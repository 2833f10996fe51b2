use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis, to_millis};
use crate::error::Result;
use crate::priority::Priority;
use crate::task::TaskRecord;

const TASK_COLUMNS: &str =
    "id, owner_id, project_id, title, done, priority, due_date, is_public, created_at, updated_at";

const DATE_FORMAT: &str = "%Y-%m-%d";

fn row_to_task(row: &rusqlite::Row) -> rusqlite::Result<TaskRecord> {
    let priority: String = row.get("priority")?;
    let due_raw: Option<String> = row.get("due_date")?;
    let due_date = match due_raw {
        Some(raw) => Some(NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|err| {
            rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(err))
        })?),
        None => None,
    };
    Ok(TaskRecord {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        project_id: row.get("project_id")?,
        title: row.get("title")?,
        done: row.get("done")?,
        priority: Priority::parse_lenient(&priority),
        due_date,
        is_public: row.get("is_public")?,
        created_at: from_millis(row.get("created_at")?),
        updated_at: from_millis(row.get("updated_at")?),
    })
}

fn format_date(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn collect(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<TaskRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, row_to_task)?;
    let mut tasks = Vec::new();
    for row in rows {
        tasks.push(row?);
    }
    Ok(tasks)
}

pub struct InsertTask<'a> {
    pub owner_id: i64,
    pub project_id: Option<i64>,
    pub title: &'a str,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
}

pub fn insert_task(conn: &Connection, task: &InsertTask<'_>) -> Result<i64> {
    let created = to_millis(task.created_at);
    conn.execute(
        "INSERT INTO tasks (owner_id, project_id, title, done, priority, due_date, is_public,
                            created_at, updated_at)
         VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7, ?7)",
        params![
            task.owner_id,
            task.project_id,
            task.title,
            task.priority.as_str(),
            format_date(task.due_date),
            task.is_public,
            created,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_task(conn: &Connection, id: i64) -> Result<Option<TaskRecord>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], row_to_task).optional()?)
}

/// Task `id` if it belongs to `owner_id`.
pub fn get_owned_task(conn: &Connection, id: i64, owner_id: i64) -> Result<Option<TaskRecord>> {
    let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND owner_id = ?2");
    Ok(conn
        .query_row(&sql, params![id, owner_id], row_to_task)
        .optional()?)
}

/// Write every mutable column of `task` back to its row.
pub fn update_task(conn: &Connection, task: &TaskRecord) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE tasks
         SET project_id = ?2, title = ?3, done = ?4, priority = ?5, due_date = ?6,
             is_public = ?7, updated_at = ?8
         WHERE id = ?1 AND owner_id = ?9",
        params![
            task.id,
            task.project_id,
            task.title,
            task.done,
            task.priority.as_str(),
            format_date(task.due_date),
            task.is_public,
            to_millis(task.updated_at),
            task.owner_id,
        ],
    )?;
    Ok(updated > 0)
}

pub fn delete_task(conn: &Connection, id: i64, owner_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(deleted > 0)
}

pub fn list_for_owner(conn: &Connection, owner_id: i64) -> Result<Vec<TaskRecord>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE owner_id = ?1 ORDER BY created_at ASC, id ASC"
    );
    collect(conn, &sql, params![owner_id])
}

pub fn list_for_project(conn: &Connection, project_id: i64) -> Result<Vec<TaskRecord>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE project_id = ?1 ORDER BY created_at DESC, id DESC"
    );
    collect(conn, &sql, params![project_id])
}

pub fn list_unassigned(conn: &Connection, owner_id: i64) -> Result<Vec<TaskRecord>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner_id = ?1 AND project_id IS NULL
         ORDER BY created_at ASC, id ASC"
    );
    collect(conn, &sql, params![owner_id])
}

/// Public tasks of `owner_id`: due date ascending with undated last, newest first on ties.
pub fn list_public(conn: &Connection, owner_id: i64) -> Result<Vec<TaskRecord>> {
    let sql = format!(
        "SELECT {TASK_COLUMNS} FROM tasks
         WHERE owner_id = ?1 AND is_public = 1
         ORDER BY due_date IS NULL, due_date ASC, created_at DESC, id DESC"
    );
    collect(conn, &sql, params![owner_id])
}

/// Detach every task from `project_id`; returns the number of tasks moved.
pub fn clear_project(conn: &Connection, project_id: i64, now: DateTime<Utc>) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE tasks SET project_id = NULL, updated_at = ?2 WHERE project_id = ?1",
        params![project_id, to_millis(now)],
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{users, Store};

    fn insert(conn: &Connection, owner: i64, title: &str, due: Option<NaiveDate>, public: bool) -> i64 {
        insert_task(
            conn,
            &InsertTask {
                owner_id: owner,
                project_id: None,
                title,
                priority: Priority::Medium,
                due_date: due,
                is_public: public,
                created_at: Utc::now(),
            },
        )
        .expect("insert task")
    }

    #[test]
    fn task_crud() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn().expect("conn");
        let owner = users::insert_user(&conn, "ann", "ann@example.com", "Ann", "Lee", Utc::now())
            .expect("user");
        let due = NaiveDate::from_ymd_opt(2024, 1, 11);
        let id = insert(&conn, owner, "Write report", due, false);

        let mut task = get_owned_task(&conn, id, owner).expect("get").expect("present");
        assert_eq!(task.title, "Write report");
        assert_eq!(task.due_date, due);
        assert!(!task.done);

        task.done = true;
        task.priority = Priority::Urgent;
        assert!(update_task(&conn, &task).expect("update"));
        let reloaded = get_task(&conn, id).expect("get").expect("present");
        assert!(reloaded.done);
        assert_eq!(reloaded.priority, Priority::Urgent);

        assert!(get_owned_task(&conn, id, owner + 1).expect("get").is_none());
        assert!(!delete_task(&conn, id, owner + 1).expect("delete"));
        assert!(delete_task(&conn, id, owner).expect("delete"));
        assert!(get_task(&conn, id).expect("get").is_none());
    }

    #[test]
    fn public_listing_orders_undated_last() {
        let store = Store::open_in_memory().expect("store");
        let conn = store.conn().expect("conn");
        let owner = users::insert_user(&conn, "ann", "ann@example.com", "Ann", "Lee", Utc::now())
            .expect("user");
        insert(&conn, owner, "undated", None, true);
        insert(&conn, owner, "later", NaiveDate::from_ymd_opt(2024, 3, 1), true);
        insert(&conn, owner, "sooner", NaiveDate::from_ymd_opt(2024, 2, 1), true);
        insert(&conn, owner, "private", NaiveDate::from_ymd_opt(2024, 1, 1), false);

        let titles: Vec<String> = list_public(&conn, owner)
            .expect("list")
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["sooner", "later", "undated"]);
    }
}
