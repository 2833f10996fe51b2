//! tm login, logout and whoami.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{AppContext, Globals};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::session::{self, Session, SessionSource};
use crate::storage::Storage;
use crate::user::{self, UserSummary};

#[derive(Serialize)]
struct LogoutOutput {
    logged_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
}

#[derive(Serialize)]
struct WhoamiOutput {
    user: UserSummary,
    email: String,
    source: SessionSource,
    started_at: DateTime<Utc>,
}

fn source_label(source: SessionSource) -> &'static str {
    match source {
        SessionSource::Flag => "--user flag",
        SessionSource::Environment => session::USER_ENV,
        SessionSource::Login => "tm login",
        SessionSource::ConfigDefault => "session.default_user",
    }
}

pub fn run_login(globals: &Globals, username_or_email: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session: Session = session::login(&ctx.store, &ctx.storage, username_or_email)?;

    let mut human = HumanOutput::new(format!("Logged in as {}", session.username));
    human.push_summary("User ID", session.user_id.to_string());
    human.push_summary("Session", session.token.to_string());
    human.push_next_step("tm task dashboard");

    emit_success(globals.output(), "login", &session, Some(&human))
}

pub fn run_logout(globals: &Globals) -> Result<()> {
    let storage = Storage::resolve(globals.data_dir.as_deref())?;
    let ended = session::logout(&storage)?;

    let output = LogoutOutput {
        logged_out: ended.is_some(),
        username: ended.as_ref().map(|session| session.username.clone()),
    };
    let mut human = match &ended {
        Some(session) => HumanOutput::new(format!("Logged out {}", session.username)),
        None => {
            let mut human = HumanOutput::new("Logged out");
            human.push_warning("no active login");
            human
        }
    };
    if std::env::var(session::USER_ENV).is_ok_and(|value| !value.trim().is_empty()) {
        human.push_warning(format!("{} is still set", session::USER_ENV));
    }

    emit_success(globals.output(), "logout", &output, Some(&human))
}

pub fn run_whoami(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let (session, source) = ctx.resolve_session(globals)?;
    let record = user::get_user(&ctx.store, session.user_id)?;

    let mut human = HumanOutput::new(record.username.clone());
    human.push_summary("Name", record.full_name());
    human.push_summary("Email", record.email.clone());
    human.push_summary("Source", source_label(source));

    let output = WhoamiOutput {
        user: record.summary(),
        email: record.email,
        source,
        started_at: session.started_at,
    };
    emit_success(globals.output(), "whoami", &output, Some(&human))
}
