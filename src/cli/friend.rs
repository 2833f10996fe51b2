//! tm friend command implementations.

use crate::cli::task::task_line;
use crate::cli::{AppContext, Globals};
use crate::error::Result;
use crate::friend::{self, FriendEntry, FriendshipRecord};
use crate::output::{emit_success, HumanOutput};

fn entry_line(entry: &FriendEntry) -> String {
    format!(
        "#{} {} ({} {}) since {}",
        entry.friendship_id,
        entry.user.username,
        entry.user.first_name,
        entry.user.last_name,
        entry.since.format("%Y-%m-%d")
    )
}

fn push_friendship_summary(human: &mut HumanOutput, row: &FriendshipRecord) {
    human.push_summary("ID", row.id.to_string());
    human.push_summary("Status", row.status.as_str());
}

pub fn run_request(globals: &Globals, target: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let request = friend::send_request(&ctx.store, &session, target)?;

    let mut human = HumanOutput::new(format!(
        "Friend request sent to {}",
        request.addressee.username
    ));
    push_friendship_summary(&mut human, &request.friendship);
    human.push_next_step("tm friend sent");

    emit_success(globals.output(), "friend request", &request, Some(&human))
}

pub fn run_accept(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let row = friend::accept_request(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Friend request accepted");
    push_friendship_summary(&mut human, &row);
    human.push_next_step("tm friend list");

    emit_success(globals.output(), "friend accept", &row, Some(&human))
}

pub fn run_reject(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let row = friend::reject_request(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Friend request rejected");
    push_friendship_summary(&mut human, &row);

    emit_success(globals.output(), "friend reject", &row, Some(&human))
}

pub fn run_remove(globals: &Globals, id: i64) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    friend::remove_friend(&ctx.store, &session, id)?;

    let mut human = HumanOutput::new("Friend removed");
    human.push_summary("ID", id.to_string());

    emit_success(
        globals.output(),
        "friend remove",
        &serde_json::json!({ "id": id, "removed": true }),
        Some(&human),
    )
}

fn emit_entries(
    globals: &Globals,
    command: &str,
    header: &str,
    entries: &[FriendEntry],
    empty_hint: Option<&str>,
) -> Result<()> {
    let mut human = HumanOutput::new(format!("{header} ({})", entries.len()));
    for entry in entries {
        human.push_detail(entry_line(entry));
    }
    if entries.is_empty() {
        if let Some(hint) = empty_hint {
            human.push_next_step(hint);
        }
    }
    emit_success(globals.output(), command, &entries, Some(&human))
}

pub fn run_list(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let friends = friend::list_friends(&ctx.store, &session)?;
    emit_entries(
        globals,
        "friend list",
        "Friends",
        &friends,
        Some("tm user search <name>"),
    )
}

pub fn run_requests(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let incoming = friend::incoming_requests(&ctx.store, &session)?;
    emit_entries(globals, "friend requests", "Incoming requests", &incoming, None)
}

pub fn run_sent(globals: &Globals) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let sent = friend::sent_requests(&ctx.store, &session)?;
    emit_entries(globals, "friend sent", "Sent requests", &sent, None)
}

pub fn run_status(globals: &Globals, username: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let relation = friend::relation_with(&ctx.store, &session, username)?;

    let mut human = HumanOutput::new(relation.user.username.clone());
    human.push_summary("Status", relation.status.as_str());
    if let Some(id) = relation.friendship_id {
        human.push_summary("Friendship", id.to_string());
    }

    emit_success(globals.output(), "friend status", &relation, Some(&human))
}

pub fn run_tasks(globals: &Globals, username: &str) -> Result<()> {
    let ctx = AppContext::open(globals)?;
    let session = ctx.session(globals)?;
    let tasks = friend::friend_public_tasks(&ctx.store, &session, username)?;

    let mut human = HumanOutput::new(format!(
        "Public tasks of {} ({})",
        username.trim(),
        tasks.len()
    ));
    for view in &tasks {
        human.push_detail(task_line(view));
    }
    if let Some(open) = tasks.iter().find(|view| !view.task.done) {
        human.push_next_step(format!("tm bump {}", open.task.id));
    }

    emit_success(globals.output(), "friend tasks", &tasks, Some(&human))
}
