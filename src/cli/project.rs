//! tm project command implementations.

use chrono::Utc;

use crate::cli::task::task_line;
use crate::cli::{AppContext, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::project::{self, NewProject, ProjectRecord, ProjectUpdate};
use crate::task::TaskView;

pub struct CreateOptions {
    pub name: String,
    pub color: Option<String>,
    pub description: Option<String>,
}

pub struct EditOptions {
    pub id: i64,
    pub name: Option<String>,
    pub color: Option<String>,
    pub description: Option<String>,
    pub clear_description: bool,
}

fn push_project_summary(human: &mut HumanOutput, project: &ProjectRecord) {
    human.push_summary("ID", project.id.to_string());
    human.push_summary("Name", project.name.clone());
    human.push_summary("Color", project.color.clone());
    if let Some(description) = &project.description {
        human.push_summary("Description", description.clone());
    }
    human.push_summary("Tasks", project.task_count.to_string());
}

pub fn run_create(globals: &Globals, options: CreateOptions) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = project::create_project(
        &ctx.store,
        &session,
        NewProject {
            name: options.name,
            color: options.color,
            description: options.description,
        },
        &ctx.config.projects.default_color,
    )?;

    let mut human = HumanOutput::new("Project created");
    push_project_summary(&mut human, &record);
    human.push_next_step(format!("tm task add <title> --project {}", record.id));

    emit_success(globals.output(), "project create", &record, Some(&human))
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let projects = project::list_projects(&ctx.store, &session)?;

    let mut human = HumanOutput::new(format!("Projects ({})", projects.len()));
    for record in &projects {
        human.push_detail(format!(
            "#{} {} {} ({} tasks)",
            record.id, record.name, record.color, record.task_count
        ));
    }

    emit_success(globals.output(), "project list", &projects, Some(&human))
}

pub fn run_show(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let details = project::get_project(&ctx.store, &session, id)?;

    let now = Utc::now();
    let mut human = HumanOutput::new(details.project.name.clone());
    push_project_summary(&mut human, &details.project);
    for record in &details.tasks {
        human.push_detail(task_line(&TaskView::new(record.clone(), now)));
    }

    emit_success(globals.output(), "project show", &details, Some(&human))
}

pub fn run_edit(globals: &Globals, options: EditOptions) -> Result<()> {
    let description = if options.clear_description {
        Some(None)
    } else {
        options.description.map(Some)
    };
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = project::edit_project(
        &ctx.store,
        &session,
        options.id,
        ProjectUpdate {
            name: options.name,
            color: options.color,
            description,
        },
    )?;

    let mut human = HumanOutput::new("Project updated");
    push_project_summary(&mut human, &record);

    emit_success(globals.output(), "project edit", &record, Some(&human))
}

pub fn run_delete(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let report = project::delete_project(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Project deleted");
    human.push_summary("ID", report.id.to_string());
    human.push_summary("Tasks kept", report.detached_tasks.to_string());

    emit_success(globals.output(), "project delete", &report, Some(&human))
}

pub fn run_move(globals: &Globals, task_id: i64, project_id: Option<i64>) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = project::move_task(&ctx.store, &session, task_id, project_id)?;

    let header = match project_id {
        Some(id) => format!("Moved task {task_id} to project {id}"),
        None => format!("Removed task {task_id} from its project"),
    };
    let human = HumanOutput::new(header);
    let view = TaskView::new(record, Utc::now());

    emit_success(globals.output(), "project move", &view, Some(&human))
}
