//! Personal tasks.
//!
//! Tasks belong to one owner, who alone may read them through these
//! operations or change them. Public tasks are additionally visible to the
//! owner's friends (see [`crate::friend::friend_public_tasks`]) and on the
//! owner's profile.

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::priority::Priority;
use crate::session::Session;
use crate::store::{self, Store};
use crate::urgency;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub id: i64,
    pub owner_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    pub title: String,
    pub done: bool,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TaskRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.done && self.due_date.is_some_and(|due| due < today)
    }
}

/// A task together with its urgency at a point in time.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: TaskRecord,
    pub effective_priority: Priority,
    pub effective_level: u8,
    pub overdue: bool,
}

impl TaskView {
    pub fn new(task: TaskRecord, now: DateTime<Utc>) -> Self {
        let effective_priority = urgency::effective_priority(&task, now);
        let overdue = task.is_overdue(now.date_naive());
        Self {
            effective_level: effective_priority.level(),
            effective_priority,
            overdue,
            task,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub is_public: bool,
    pub project_id: Option<i64>,
}

/// Field changes; `None` leaves a field untouched. The nested options
/// distinguish "clear" (`Some(None)`) from "leave".
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub is_public: Option<bool>,
    pub project_id: Option<Option<i64>>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.is_public.is_none()
            && self.project_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectFilter {
    All,
    Project(i64),
    Unassigned,
}

pub fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    Ok(title.to_string())
}

/// Parse a due date: `YYYY-MM-DD`, `today`, `tomorrow` or `+Nd`.
pub fn parse_due_date(raw: &str, today: NaiveDate) -> Result<NaiveDate> {
    let value = raw.trim();
    let lowered = value.to_ascii_lowercase();
    match lowered.as_str() {
        "today" => return Ok(today),
        "tomorrow" => {
            return today
                .checked_add_days(Days::new(1))
                .ok_or_else(|| Error::InvalidArgument("due date is out of range".to_string()))
        }
        _ => {}
    }
    if let Some(days) = lowered
        .strip_prefix('+')
        .and_then(|rest| rest.strip_suffix('d'))
    {
        let days: u64 = days.parse().map_err(|_| {
            Error::InvalidArgument(format!("invalid relative due date '{value}'"))
        })?;
        return today.checked_add_days(Days::new(days)).ok_or_else(|| {
            Error::InvalidArgument(format!("due date '{value}' is out of range"))
        });
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        Error::InvalidArgument(format!(
            "invalid due date '{value}' (expected YYYY-MM-DD, today, tomorrow or +Nd)"
        ))
    })
}

fn ensure_project_owned(conn: &rusqlite::Connection, project_id: i64, owner_id: i64) -> Result<()> {
    store::projects::get_owned_project(conn, project_id, owner_id)?
        .map(|_| ())
        .ok_or_else(|| Error::not_found("project", project_id))
}

pub fn create_task(store: &Store, session: &Session, new_task: NewTask) -> Result<TaskRecord> {
    let title = validate_title(&new_task.title)?;
    let priority = new_task.priority.unwrap_or_default();
    let now = store::now();

    let id = store.transaction(|tx| {
        if let Some(project_id) = new_task.project_id {
            ensure_project_owned(tx, project_id, session.user_id)?;
        }
        store::tasks::insert_task(
            tx,
            &store::tasks::InsertTask {
                owner_id: session.user_id,
                project_id: new_task.project_id,
                title: &title,
                priority,
                due_date: new_task.due_date,
                is_public: new_task.is_public,
                created_at: now,
            },
        )
    })?;
    info!(task_id = id, owner_id = session.user_id, "created task");

    Ok(TaskRecord {
        id,
        owner_id: session.user_id,
        project_id: new_task.project_id,
        title,
        done: false,
        priority,
        due_date: new_task.due_date,
        is_public: new_task.is_public,
        created_at: now,
        updated_at: now,
    })
}

/// One of the caller's tasks; other users' tasks read as missing.
pub fn get_task(store: &Store, session: &Session, id: i64) -> Result<TaskRecord> {
    let conn = store.conn()?;
    store::tasks::get_owned_task(&conn, id, session.user_id)?
        .ok_or_else(|| Error::not_found("task", id))
}

pub fn update_task(
    store: &Store,
    session: &Session,
    id: i64,
    update: TaskUpdate,
) -> Result<TaskRecord> {
    if update.is_empty() {
        return Err(Error::InvalidArgument("nothing to update".to_string()));
    }
    let title = update.title.as_deref().map(validate_title).transpose()?;

    store.transaction(|tx| {
        let mut task = store::tasks::get_owned_task(tx, id, session.user_id)?
            .ok_or_else(|| Error::not_found("task", id))?;

        if let Some(title) = title {
            task.title = title;
        }
        if let Some(priority) = update.priority {
            task.priority = priority;
        }
        if let Some(due_date) = update.due_date {
            task.due_date = due_date;
        }
        if let Some(is_public) = update.is_public {
            task.is_public = is_public;
        }
        if let Some(project_id) = update.project_id {
            if let Some(project_id) = project_id {
                ensure_project_owned(tx, project_id, session.user_id)?;
            }
            task.project_id = project_id;
        }
        task.updated_at = store::now();

        store::tasks::update_task(tx, &task)?;
        debug!(task_id = id, "updated task");
        Ok(task)
    })
}

pub fn set_done(store: &Store, session: &Session, id: i64, done: bool) -> Result<TaskRecord> {
    store.transaction(|tx| {
        let mut task = store::tasks::get_owned_task(tx, id, session.user_id)?
            .ok_or_else(|| Error::not_found("task", id))?;
        if task.done != done {
            task.done = done;
            task.updated_at = store::now();
            store::tasks::update_task(tx, &task)?;
            info!(task_id = id, done, "changed task completion");
        }
        Ok(task)
    })
}

pub fn delete_task(store: &Store, session: &Session, id: i64) -> Result<()> {
    let conn = store.conn()?;
    if !store::tasks::delete_task(&conn, id, session.user_id)? {
        return Err(Error::not_found("task", id));
    }
    info!(task_id = id, "deleted task");
    Ok(())
}

pub fn list_tasks(store: &Store, session: &Session, filter: ProjectFilter) -> Result<Vec<TaskRecord>> {
    let conn = store.conn()?;
    match filter {
        ProjectFilter::All => store::tasks::list_for_owner(&conn, session.user_id),
        ProjectFilter::Unassigned => store::tasks::list_unassigned(&conn, session.user_id),
        ProjectFilter::Project(project_id) => {
            ensure_project_owned(&conn, project_id, session.user_id)?;
            store::tasks::list_for_project(&conn, project_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::{self, NewUser};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn setup() -> (Store, Session) {
        let store = Store::open_in_memory().expect("store");
        let user = user::register(
            &store,
            &NewUser {
                username: "ann".to_string(),
                email: "ann@example.com".to_string(),
                first_name: "Ann".to_string(),
                last_name: "Lee".to_string(),
            },
        )
        .expect("register");
        (store, Session::for_user(&user))
    }

    #[test]
    fn parse_due_date_forms() {
        let today = date(2024, 1, 31);
        assert_eq!(parse_due_date("2024-02-29", today).expect("iso"), date(2024, 2, 29));
        assert_eq!(parse_due_date("Today", today).expect("today"), today);
        assert_eq!(parse_due_date("tomorrow", today).expect("tomorrow"), date(2024, 2, 1));
        assert_eq!(parse_due_date("+7d", today).expect("relative"), date(2024, 2, 7));
        for bad in ["2024-02-30", "next week", "+xd", ""] {
            assert!(matches!(
                parse_due_date(bad, today),
                Err(Error::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn create_applies_defaults() {
        let (store, session) = setup();
        let task = create_task(
            &store,
            &session,
            NewTask {
                title: "  Buy milk ".to_string(),
                ..NewTask::default()
            },
        )
        .expect("create");
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.priority, Priority::Medium);
        assert!(!task.is_public);
        assert!(!task.done);
        assert_eq!(get_task(&store, &session, task.id).expect("get"), task);
    }

    #[test]
    fn update_returns_the_stored_row() {
        let (store, session) = setup();
        let task = create_task(
            &store,
            &session,
            NewTask {
                title: "Buy milk".to_string(),
                ..NewTask::default()
            },
        )
        .expect("create");
        let updated = update_task(
            &store,
            &session,
            task.id,
            TaskUpdate {
                is_public: Some(true),
                ..TaskUpdate::default()
            },
        )
        .expect("update");
        assert_eq!(get_task(&store, &session, task.id).expect("get"), updated);
        let done = set_done(&store, &session, task.id, true).expect("done");
        assert_eq!(get_task(&store, &session, task.id).expect("get"), done);
    }

    #[test]
    fn empty_title_is_rejected() {
        let (store, session) = setup();
        let err = create_task(
            &store,
            &session,
            NewTask {
                title: "   ".to_string(),
                ..NewTask::default()
            },
        )
        .expect_err("empty title");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn update_toggle_and_delete() {
        let (store, session) = setup();
        let task = create_task(
            &store,
            &session,
            NewTask {
                title: "Report".to_string(),
                due_date: Some(date(2024, 1, 11)),
                ..NewTask::default()
            },
        )
        .expect("create");

        let updated = update_task(
            &store,
            &session,
            task.id,
            TaskUpdate {
                priority: Some(Priority::High),
                due_date: Some(None),
                is_public: Some(true),
                ..TaskUpdate::default()
            },
        )
        .expect("update");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.due_date, None);
        assert!(updated.is_public);
        assert_eq!(updated.title, "Report");

        assert!(set_done(&store, &session, task.id, true).expect("done").done);
        assert!(!set_done(&store, &session, task.id, false).expect("undone").done);

        delete_task(&store, &session, task.id).expect("delete");
        assert!(matches!(
            get_task(&store, &session, task.id),
            Err(Error::NotFound { entity: "task", .. })
        ));
        assert!(matches!(
            delete_task(&store, &session, task.id),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn unknown_project_is_not_found() {
        let (store, session) = setup();
        let err = create_task(
            &store,
            &session,
            NewTask {
                title: "Orphan".to_string(),
                project_id: Some(99),
                ..NewTask::default()
            },
        )
        .expect_err("missing project");
        assert!(matches!(err, Error::NotFound { entity: "project", .. }));
    }

    #[test]
    fn view_reports_overdue_and_effective_priority() {
        let (store, session) = setup();
        let task = create_task(
            &store,
            &session,
            NewTask {
                title: "Late".to_string(),
                priority: Some(Priority::Low),
                due_date: Some(date(2000, 1, 1)),
                ..NewTask::default()
            },
        )
        .expect("create");
        let view = TaskView::new(task, Utc::now());
        assert!(view.overdue);
        assert_eq!(view.effective_priority, Priority::Low);
        assert_eq!(view.effective_level, 1);
    }
}
