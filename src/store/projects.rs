use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{from_millis, to_millis};
use crate::error::Result;
use crate::project::ProjectRecord;

const PROJECT_COLUMNS: &str = "p.id, p.owner_id, p.name, p.color, p.description, p.created_at, \
     p.updated_at, (SELECT COUNT(*) FROM tasks t WHERE t.project_id = p.id) AS task_count";

fn row_to_project(row: &rusqlite::Row) -> rusqlite::Result<ProjectRecord> {
    Ok(ProjectRecord {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        description: row.get("description")?,
        created_at: from_millis(row.get("created_at")?),
        updated_at: from_millis(row.get("updated_at")?),
        task_count: row.get("task_count")?,
    })
}

pub fn insert_project(
    conn: &Connection,
    owner_id: i64,
    name: &str,
    color: &str,
    description: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64> {
    let ts = to_millis(now);
    conn.execute(
        "INSERT INTO projects (owner_id, name, color, description, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![owner_id, name, color, description, ts],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_owned_project(
    conn: &Connection,
    id: i64,
    owner_id: i64,
) -> Result<Option<ProjectRecord>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1 AND p.owner_id = ?2");
    Ok(conn
        .query_row(&sql, params![id, owner_id], row_to_project)
        .optional()?)
}

/// Projects of `owner_id`, newest first.
pub fn list_for_owner(conn: &Connection, owner_id: i64) -> Result<Vec<ProjectRecord>> {
    let sql = format!(
        "SELECT {PROJECT_COLUMNS} FROM projects p
         WHERE p.owner_id = ?1
         ORDER BY p.created_at DESC, p.id DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], row_to_project)?;
    let mut projects = Vec::new();
    for row in rows {
        projects.push(row?);
    }
    Ok(projects)
}

pub fn update_project(conn: &Connection, project: &ProjectRecord) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE projects SET name = ?3, color = ?4, description = ?5, updated_at = ?6
         WHERE id = ?1 AND owner_id = ?2",
        params![
            project.id,
            project.owner_id,
            project.name,
            project.color,
            project.description,
            to_millis(project.updated_at),
        ],
    )?;
    Ok(updated > 0)
}

pub fn delete_project(conn: &Connection, id: i64, owner_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM projects WHERE id = ?1 AND owner_id = ?2",
        params![id, owner_id],
    )?;
    Ok(deleted > 0)
}
