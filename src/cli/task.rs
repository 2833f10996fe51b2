//! tm task command implementations.

use chrono::{Local, NaiveDate, Utc};
use serde::Serialize;

use crate::cli::{yes_no, AppContext, Globals};
use crate::dashboard::{self, Bucket};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::priority::Priority;
use crate::task::{self, NewTask, ProjectFilter, TaskUpdate, TaskView};

pub struct AddOptions {
    pub title: String,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub public: bool,
    pub project: Option<i64>,
}

pub struct EditOptions {
    pub id: i64,
    pub title: Option<String>,
    pub priority: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub public: bool,
    pub private: bool,
}

pub struct ListOptions {
    pub project: Option<i64>,
    pub unassigned: bool,
    pub open: bool,
}

#[derive(Serialize)]
struct DeletedOutput {
    id: i64,
    deleted: bool,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_priority(raw: Option<&str>) -> Result<Option<Priority>> {
    raw.map(str::parse::<Priority>).transpose()
}

fn parse_due(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    let today = local_today();
    raw.map(|value| task::parse_due_date(value, today)).transpose()
}

pub(crate) fn task_line(view: &TaskView) -> String {
    let mut line = format!(
        "#{} [{}] {}",
        view.task.id, view.effective_priority, view.task.title
    );
    if let Some(due) = view.task.due_date {
        line.push_str(&format!(" (due {due})"));
    }
    if view.task.done {
        line.push_str(" done");
    } else if view.overdue {
        line.push_str(" overdue");
    }
    if view.task.is_public {
        line.push_str(" public");
    }
    line
}

fn push_task_summary(human: &mut HumanOutput, view: &TaskView) {
    human.push_summary("ID", view.task.id.to_string());
    human.push_summary("Title", view.task.title.clone());
    human.push_summary("Priority", view.task.priority.as_str());
    if view.effective_priority != view.task.priority {
        human.push_summary("Effective priority", view.effective_priority.as_str());
    }
    if let Some(due) = view.task.due_date {
        human.push_summary("Due", due.to_string());
    }
    if let Some(project_id) = view.task.project_id {
        human.push_summary("Project", project_id.to_string());
    }
    human.push_summary("Public", yes_no(view.task.is_public));
    human.push_summary("Done", yes_no(view.task.done));
    if view.overdue {
        human.push_warning("task is overdue");
    }
}

pub fn run_add(globals: &Globals, options: AddOptions) -> Result<()> {
    let priority = parse_priority(options.priority.as_deref())?;
    let due_date = parse_due(options.due.as_deref())?;
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;

    let record = task::create_task(
        &ctx.store,
        &session,
        NewTask {
            title: options.title,
            priority,
            due_date,
            is_public: options.public,
            project_id: options.project,
        },
    )?;
    let view = TaskView::new(record, Utc::now());

    let mut human = HumanOutput::new("Task created");
    push_task_summary(&mut human, &view);
    human.push_next_step("tm task list");

    emit_success(globals.output(), "task add", &view, Some(&human))
}

pub fn run_edit(globals: &Globals, options: EditOptions) -> Result<()> {
    let due_date = if options.clear_due {
        Some(None)
    } else {
        parse_due(options.due.as_deref())?.map(Some)
    };
    let is_public = match (options.public, options.private) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };
    let update = TaskUpdate {
        title: options.title,
        priority: parse_priority(options.priority.as_deref())?,
        due_date,
        is_public,
        project_id: None,
    };

    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = task::update_task(&ctx.store, &session, options.id, update)?;
    let view = TaskView::new(record, Utc::now());

    let mut human = HumanOutput::new("Task updated");
    push_task_summary(&mut human, &view);

    emit_success(globals.output(), "task edit", &view, Some(&human))
}

pub fn run_set_done(globals: &Globals, id: i64, done: bool) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = task::set_done(&ctx.store, &session, id, done)?;
    let view = TaskView::new(record, Utc::now());

    let header = if done {
        "Task completed"
    } else {
        "Task reopened"
    };
    let mut human = HumanOutput::new(header);
    human.push_summary("ID", view.task.id.to_string());
    human.push_summary("Title", view.task.title.clone());

    let command = if done { "task done" } else { "task undone" };
    emit_success(globals.output(), command, &view, Some(&human))
}

pub fn run_rm(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    task::delete_task(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Task deleted");
    human.push_summary("ID", id.to_string());

    emit_success(
        globals.output(),
        "task rm",
        &DeletedOutput { id, deleted: true },
        Some(&human),
    )
}

pub fn run_list(globals: &Globals, options: ListOptions) -> Result<()> {
    let filter = match (options.project, options.unassigned) {
        (Some(project_id), _) => ProjectFilter::Project(project_id),
        (None, true) => ProjectFilter::Unassigned,
        (None, false) => ProjectFilter::All,
    };
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let now = Utc::now();

    let views: Vec<TaskView> = task::list_tasks(&ctx.store, &session, filter)?
        .into_iter()
        .filter(|record| !options.open || !record.done)
        .map(|record| TaskView::new(record, now))
        .collect();

    let mut human = HumanOutput::new(format!("Tasks ({})", views.len()));
    for view in &views {
        human.push_detail(task_line(view));
    }
    if views.is_empty() {
        human.push_next_step("tm task add <title>");
    }

    emit_success(globals.output(), "task list", &views, Some(&human))
}

pub fn run_show(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let view = TaskView::new(task::get_task(&ctx.store, &session, id)?, Utc::now());

    let mut human = HumanOutput::new(view.task.title.clone());
    push_task_summary(&mut human, &view);
    human.push_summary("Created", view.task.created_at.to_rfc3339());
    human.push_summary("Updated", view.task.updated_at.to_rfc3339());

    emit_success(globals.output(), "task show", &view, Some(&human))
}

pub fn run_dashboard(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let board = dashboard::dashboard(&ctx.store, &session, local_today(), Utc::now())?;

    let mut human = HumanOutput::new(format!("Dashboard for {}", board.today));
    human.push_summary("Total", board.stats.total.to_string());
    human.push_summary("Completed", board.stats.completed.to_string());
    human.push_summary("Pending", board.stats.pending.to_string());
    human.push_summary("High priority", board.stats.high_priority.to_string());
    human.push_summary("Due today", board.stats.due_today.to_string());
    human.push_summary("Next seven days", board.stats.next_seven_days.to_string());
    for bucket in Bucket::ALL {
        for view in board.buckets.get(bucket) {
            human.push_detail(format!("{}: {}", bucket.label(), task_line(view)));
        }
    }
    if board.stats.overdue > 0 {
        human.push_warning(format!("{} overdue task(s)", board.stats.overdue));
    }

    emit_success(globals.output(), "task dashboard", &board, Some(&human))
}
