//! tm notify command implementations.

use serde::Serialize;

use crate::cli::{AppContext, Globals};
use crate::error::Result;
use crate::notification::{self, NotificationRecord};
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct UnreadOutput {
    unread: u64,
}

#[derive(Serialize)]
struct ReadAllOutput {
    updated: usize,
}

fn notification_line(record: &NotificationRecord) -> String {
    let marker = if record.is_read { " " } else { "*" };
    format!(
        "{marker} #{} [{}] {} ({})",
        record.id,
        record.kind,
        record.message,
        record.created_at.format("%Y-%m-%d %H:%M")
    )
}

pub fn run_list(globals: &Globals, unread_only: bool, limit: Option<usize>) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let limit = limit.unwrap_or(ctx.config.notifications.list_limit);
    let records = notification::list(&ctx.store, &session, unread_only, limit)?;

    let mut human = HumanOutput::new(format!("Notifications ({})", records.len()));
    for record in &records {
        human.push_detail(notification_line(record));
    }
    if records.iter().any(|record| !record.is_read) {
        human.push_next_step("tm notify read-all");
    }

    emit_success(globals.output(), "notify list", &records, Some(&human))
}

pub fn run_unread(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let unread = notification::unread_count(&ctx.store, &session)?;

    let human = HumanOutput::new(format!("{unread} unread"));
    emit_success(
        globals.output(),
        "notify unread",
        &UnreadOutput { unread },
        Some(&human),
    )
}

pub fn run_read(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let record = notification::mark_read(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Notification read");
    human.push_summary("ID", record.id.to_string());
    human.push_summary("Message", record.message.clone());

    emit_success(globals.output(), "notify read", &record, Some(&human))
}

pub fn run_read_all(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let updated = notification::mark_all_read(&ctx.store, &session)?;

    let human = HumanOutput::new(format!("Marked {updated} notification(s) read"));
    emit_success(
        globals.output(),
        "notify read-all",
        &ReadAllOutput { updated },
        Some(&human),
    )
}

pub fn run_rm(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    notification::delete(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Notification deleted");
    human.push_summary("ID", id.to_string());

    emit_success(
        globals.output(),
        "notify rm",
        &serde_json::json!({ "id": id, "deleted": true }),
        Some(&human),
    )
}
