//! tm user command implementations.

use serde::Serialize;

use crate::cli::{yes_no, AppContext, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::search;
use crate::session::{self, Session};
use crate::user::{self, NewUser, UserRecord};

pub struct RegisterOptions {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub login: bool,
}

#[derive(Serialize)]
struct RegisterOutput {
    user: UserRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    session: Option<Session>,
}

pub fn run_register(globals: &Globals, options: RegisterOptions) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let record = user::register(
        &ctx.store,
        &NewUser {
            username: options.username,
            email: options.email,
            first_name: options.first_name,
            last_name: options.last_name,
        },
    )?;
    let session = if options.login {
        Some(session::login(&ctx.store, &ctx.storage, &record.username)?)
    } else {
        None
    };

    let mut human = HumanOutput::new(format!("Registered {}", record.username));
    human.push_summary("ID", record.id.to_string());
    human.push_summary("Name", record.full_name());
    human.push_summary("Email", record.email.clone());
    if session.is_some() {
        human.push_summary("Logged in", "yes");
    } else {
        human.push_next_step(format!("tm login {}", record.username));
    }

    let output = RegisterOutput {
        user: record,
        session,
    };
    emit_success(globals.output(), "user register", &output, Some(&human))
}

pub fn run_search(globals: &Globals, query: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let hits = search::search_users(&ctx.store, &session, query, &ctx.config.search)?;

    let mut human = HumanOutput::new(format!("Users matching '{}' ({})", query.trim(), hits.len()));
    for hit in &hits {
        human.push_detail(format!(
            "{} ({} {}) score {}",
            hit.user.username, hit.user.first_name, hit.user.last_name, hit.score
        ));
    }
    if let Some(top) = hits.first() {
        human.push_next_step(format!("tm user profile {}", top.user.username));
    }

    emit_success(globals.output(), "user search", &hits, Some(&human))
}

pub fn run_profile(globals: &Globals, username: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let profile = user::profile(&ctx.store, &session, username)?;

    let mut human = HumanOutput::new(format!(
        "{} ({} {})",
        profile.user.username, profile.user.first_name, profile.user.last_name
    ));
    human.push_summary(
        "Member since",
        profile.member_since.format("%Y-%m-%d").to_string(),
    );
    human.push_summary("Friendship", profile.friendship_status.as_str());
    human.push_summary("Public tasks", profile.stats.public_tasks.to_string());
    human.push_summary("Completed", profile.stats.completed_tasks.to_string());
    for view in &profile.tasks {
        let due = view
            .task
            .due_date
            .map(|due| format!(" due {due}"))
            .unwrap_or_default();
        human.push_detail(format!(
            "#{} {} [{}]{} done: {}",
            view.task.id,
            view.task.title,
            view.effective_priority,
            due,
            yes_no(view.task.done)
        ));
    }
    if profile.user.id != session.user_id
        && profile.friendship_status == crate::friend::RelationStatus::None
    {
        human.push_next_step(format!("tm friend request {}", profile.user.username));
    }

    emit_success(globals.output(), "user profile", &profile, Some(&human))
}
