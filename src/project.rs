//! Projects group a user's tasks.
//!
//! A project belongs to one user. Deleting it detaches its tasks
//! (`project_id` becomes empty); the tasks themselves are kept.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::store::{self, Store};
use crate::task::TaskRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectRecord {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub task_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: ProjectRecord,
    pub tasks: Vec<TaskRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    /// `Some(None)` clears the description
    pub description: Option<Option<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDeleteReport {
    pub id: i64,
    pub detached_tasks: usize,
}

/// `#rgb` or `#rrggbb`.
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

fn validate_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "project name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_color(raw: &str) -> Result<String> {
    let color = raw.trim().to_ascii_lowercase();
    if !is_hex_color(&color) {
        return Err(Error::InvalidArgument(format!(
            "invalid project color '{}' (expected #rgb or #rrggbb)",
            raw.trim()
        )));
    }
    Ok(color)
}

fn normalize_description(raw: Option<String>) -> Option<String> {
    raw.map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn create_project(
    store: &Store,
    session: &Session,
    new_project: NewProject,
    default_color: &str,
) -> Result<ProjectRecord> {
    let name = validate_name(&new_project.name)?;
    let color = validate_color(new_project.color.as_deref().unwrap_or(default_color))?;
    let description = normalize_description(new_project.description);

    let conn = store.conn()?;
    let id = store::projects::insert_project(
        &conn,
        session.user_id,
        &name,
        &color,
        description.as_deref(),
        store::now(),
    )?;
    info!(project_id = id, owner_id = session.user_id, "created project");
    store::projects::get_owned_project(&conn, id, session.user_id)?
        .ok_or_else(|| Error::OperationFailed(format!("project {id} vanished after insert")))
}

pub fn list_projects(store: &Store, session: &Session) -> Result<Vec<ProjectRecord>> {
    let conn = store.conn()?;
    store::projects::list_for_owner(&conn, session.user_id)
}

pub fn get_project(store: &Store, session: &Session, id: i64) -> Result<ProjectDetails> {
    let conn = store.conn()?;
    let project = store::projects::get_owned_project(&conn, id, session.user_id)?
        .ok_or_else(|| Error::not_found("project", id))?;
    let tasks = store::tasks::list_for_project(&conn, id)?;
    Ok(ProjectDetails { project, tasks })
}

pub fn edit_project(
    store: &Store,
    session: &Session,
    id: i64,
    update: ProjectUpdate,
) -> Result<ProjectRecord> {
    if update.name.is_none() && update.color.is_none() && update.description.is_none() {
        return Err(Error::InvalidArgument("nothing to update".to_string()));
    }
    let name = update.name.as_deref().map(validate_name).transpose()?;
    let color = update.color.as_deref().map(validate_color).transpose()?;

    store.transaction(|tx| {
        let mut project = store::projects::get_owned_project(tx, id, session.user_id)?
            .ok_or_else(|| Error::not_found("project", id))?;
        if let Some(name) = name {
            project.name = name;
        }
        if let Some(color) = color {
            project.color = color;
        }
        if let Some(description) = update.description {
            project.description = normalize_description(description);
        }
        project.updated_at = store::now();
        store::projects::update_project(tx, &project)?;
        Ok(project)
    })
}

pub fn delete_project(store: &Store, session: &Session, id: i64) -> Result<ProjectDeleteReport> {
    let report = store.transaction(|tx| {
        if store::projects::get_owned_project(tx, id, session.user_id)?.is_none() {
            return Err(Error::not_found("project", id));
        }
        let detached_tasks = store::tasks::clear_project(tx, id, store::now())?;
        store::projects::delete_project(tx, id, session.user_id)?;
        Ok(ProjectDeleteReport { id, detached_tasks })
    })?;
    info!(project_id = id, detached = report.detached_tasks, "deleted project");
    Ok(report)
}

/// Move one of the caller's tasks into `project_id`, or out of any project.
pub fn move_task(
    store: &Store,
    session: &Session,
    task_id: i64,
    project_id: Option<i64>,
) -> Result<TaskRecord> {
    store.transaction(|tx| {
        if let Some(project_id) = project_id {
            if store::projects::get_owned_project(tx, project_id, session.user_id)?.is_none() {
                return Err(Error::not_found("project", project_id));
            }
        }
        let mut task = store::tasks::get_owned_task(tx, task_id, session.user_id)?
            .ok_or_else(|| Error::not_found("task", task_id))?;
        task.project_id = project_id;
        task.updated_at = store::now();
        store::tasks::update_task(tx, &task)?;
        Ok(task)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{self, NewTask};
    use crate::user::{self, NewUser};

    fn session(store: &Store, username: &str) -> Session {
        let user = user::register(
            store,
            &NewUser {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
            },
        )
        .expect("register");
        Session::for_user(&user)
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#3b82f6"));
        assert!(is_hex_color("#FFF"));
        assert!(!is_hex_color("3b82f6"));
        assert!(!is_hex_color("#3b82f"));
        assert!(!is_hex_color("#zzzzzz"));
    }

    #[test]
    fn create_uses_default_color_and_rejects_blank_name() {
        let store = Store::open_in_memory().expect("store");
        let ann = session(&store, "ann");
        let project = create_project(
            &store,
            &ann,
            NewProject {
                name: " Garden ".to_string(),
                ..NewProject::default()
            },
            "#3b82f6",
        )
        .expect("create");
        assert_eq!(project.name, "Garden");
        assert_eq!(project.color, "#3b82f6");
        assert_eq!(project.task_count, 0);

        let err = create_project(&store, &ann, NewProject::default(), "#3b82f6")
            .expect_err("blank name");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn delete_detaches_tasks() {
        let store = Store::open_in_memory().expect("store");
        let ann = session(&store, "ann");
        let project = create_project(
            &store,
            &ann,
            NewProject {
                name: "Garden".to_string(),
                ..NewProject::default()
            },
            "#3b82f6",
        )
        .expect("create");
        let task = task::create_task(
            &store,
            &ann,
            NewTask {
                title: "Weed beds".to_string(),
                project_id: Some(project.id),
                ..NewTask::default()
            },
        )
        .expect("task");

        let report = delete_project(&store, &ann, project.id).expect("delete");
        assert_eq!(report.detached_tasks, 1);
        let kept = task::get_task(&store, &ann, task.id).expect("task kept");
        assert_eq!(kept.project_id, None);
        assert!(matches!(
            get_project(&store, &ann, project.id),
            Err(Error::NotFound { entity: "project", .. })
        ));
    }

    #[test]
    fn other_users_projects_are_invisible() {
        let store = Store::open_in_memory().expect("store");
        let ann = session(&store, "ann");
        let bob = session(&store, "bob");
        let project = create_project(
            &store,
            &ann,
            NewProject {
                name: "Private".to_string(),
                ..NewProject::default()
            },
            "#3b82f6",
        )
        .expect("create");
        let bobs_task = task::create_task(
            &store,
            &bob,
            NewTask {
                title: "Bob's".to_string(),
                ..NewTask::default()
            },
        )
        .expect("task");

        assert!(matches!(
            get_project(&store, &bob, project.id),
            Err(Error::NotFound { .. })
        ));
        assert!(matches!(
            move_task(&store, &bob, bobs_task.id, Some(project.id)),
            Err(Error::NotFound { entity: "project", .. })
        ));
        assert!(matches!(
            move_task(&store, &ann, bobs_task.id, Some(project.id)),
            Err(Error::NotFound { entity: "task", .. })
        ));
    }

    #[test]
    fn move_task_in_and_out() {
        let store = Store::open_in_memory().expect("store");
        let ann = session(&store, "ann");
        let project = create_project(
            &store,
            &ann,
            NewProject {
                name: "Garden".to_string(),
                color: Some("#10B981".to_string()),
                description: Some("  ".to_string()),
            },
            "#3b82f6",
        )
        .expect("create");
        assert_eq!(project.color, "#10b981");
        assert_eq!(project.description, None);

        let task = task::create_task(
            &store,
            &ann,
            NewTask {
                title: "Mow".to_string(),
                ..NewTask::default()
            },
        )
        .expect("task");
        let moved = move_task(&store, &ann, task.id, Some(project.id)).expect("move in");
        assert_eq!(moved.project_id, Some(project.id));
        assert_eq!(get_project(&store, &ann, project.id).expect("get").tasks.len(), 1);

        let moved = move_task(&store, &ann, task.id, None).expect("move out");
        assert_eq!(moved.project_id, None);
        assert_eq!(
            get_project(&store, &ann, project.id).expect("get").project.task_count,
            0
        );
    }
}
