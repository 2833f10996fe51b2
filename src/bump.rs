//! Bumps: a nudge from a friend about one of your public tasks.
//!
//! A bump is not stored; it produces exactly one `bump` notification for
//! the task owner. Checks run in a fixed order so the reported reason is
//! stable: missing task, own task, private task, not friends.

use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};
use crate::friend;
use crate::notification::{self, NotificationType, Reference, REFERENCE_TASK};
use crate::session::Session;
use crate::store::{self, Store};
use crate::task::TaskRecord;

#[derive(Debug, Clone, Serialize)]
pub struct BumpReceipt {
    pub notification_id: i64,
    pub task_id: i64,
    pub recipient_id: i64,
    pub message: String,
}

/// Bump rules over already-loaded facts.
pub fn authorize_bump(from_user_id: i64, task: &TaskRecord, are_friends: bool) -> Result<()> {
    if task.owner_id == from_user_id {
        return Err(Error::SelfBump);
    }
    if !task.is_public {
        return Err(Error::PrivateTask);
    }
    if !are_friends {
        return Err(Error::NotFriends);
    }
    Ok(())
}

pub fn send_bump(
    store: &Store,
    session: &Session,
    task_id: i64,
    note: Option<&str>,
) -> Result<BumpReceipt> {
    let note = note.map(str::trim).filter(|text| !text.is_empty());

    let receipt = store.transaction(|tx| {
        let task = store::tasks::get_task(tx, task_id)?
            .ok_or_else(|| Error::not_found("task", task_id))?;
        let friends = task.owner_id != session.user_id
            && friend::are_friends(tx, session.user_id, task.owner_id)?;
        authorize_bump(session.user_id, &task, friends)?;

        let from = store::users::get_user(tx, session.user_id)?
            .ok_or_else(|| Error::not_found("user", session.user_id))?;
        let message = notification::bump_message(&from, &task.title, note);
        let notification_id = notification::emit(
            tx,
            task.owner_id,
            &from,
            NotificationType::Bump,
            &message,
            Some(Reference {
                id: task.id,
                kind: REFERENCE_TASK,
            }),
        )?;
        Ok(BumpReceipt {
            notification_id,
            task_id: task.id,
            recipient_id: task.owner_id,
            message,
        })
    })?;

    info!(
        task_id,
        from_user_id = session.user_id,
        recipient_id = receipt.recipient_id,
        "sent bump"
    );
    Ok(receipt)
}
