//! Notifications delivered to users by friend and bump events.
//!
//! Notifications are append-only apart from `is_read`, which only ever
//! moves from false to true. Recipients may delete their own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::Session;
use crate::store::{self, Store};
use crate::user::UserRecord;

pub const REFERENCE_TASK: &str = "task";
pub const REFERENCE_FRIEND: &str = "friend";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    Reminder,
    Overdue,
    Bump,
    FriendRequest,
    FriendAccepted,
    Completed,
}

impl NotificationType {
    pub const ALL: [NotificationType; 6] = [
        NotificationType::Reminder,
        NotificationType::Overdue,
        NotificationType::Bump,
        NotificationType::FriendRequest,
        NotificationType::FriendAccepted,
        NotificationType::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::Reminder => "reminder",
            NotificationType::Overdue => "overdue",
            NotificationType::Bump => "bump",
            NotificationType::FriendRequest => "friend_request",
            NotificationType::FriendAccepted => "friend_accepted",
            NotificationType::Completed => "completed",
        }
    }

    /// Stored kinds that no longer parse read back as reminders.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(NotificationType::Reminder)
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        NotificationType::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::InvalidArgument(format!("unknown notification type '{trimmed}'")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub id: i64,
    pub recipient_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_user_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_username: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub is_read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub fn friend_request_message(from: &UserRecord) -> String {
    format!("{} sent you a friend request", from.full_name())
}

pub fn friend_accepted_message(from: &UserRecord) -> String {
    format!("{} accepted your friend request", from.full_name())
}

pub fn bump_message(from: &UserRecord, task_title: &str, note: Option<&str>) -> String {
    let mut message = format!("{} bumped your task \"{}\"", from.first_name, task_title);
    if let Some(note) = note {
        message.push_str(&format!(": \"{note}\""));
    }
    message
}

/// What a notification points at.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub id: i64,
    pub kind: &'static str,
}

/// Record a notification for `recipient_id`. Runs on the caller's
/// connection so it commits or rolls back with the triggering change.
pub(crate) fn emit(
    conn: &Connection,
    recipient_id: i64,
    from: &UserRecord,
    kind: NotificationType,
    message: &str,
    reference: Option<Reference>,
) -> Result<i64> {
    let id = store::notifications::insert_notification(
        conn,
        &store::notifications::InsertNotification {
            recipient_id,
            from_user_id: Some(from.id),
            kind,
            message,
            reference_id: reference.map(|r| r.id),
            reference_type: reference.map(|r| r.kind),
            created_at: store::now(),
        },
    )?;
    debug!(notification_id = id, recipient_id, kind = %kind, "emitted notification");
    Ok(id)
}

pub fn list(
    store: &Store,
    session: &Session,
    unread_only: bool,
    limit: usize,
) -> Result<Vec<NotificationRecord>> {
    let conn = store.conn()?;
    store::notifications::list_for_recipient(&conn, session.user_id, unread_only, limit)
}

pub fn unread_count(store: &Store, session: &Session) -> Result<u64> {
    let conn = store.conn()?;
    store::notifications::unread_count(&conn, session.user_id)
}

/// Mark one of the caller's notifications read. Repeating it is harmless.
pub fn mark_read(store: &Store, session: &Session, id: i64) -> Result<NotificationRecord> {
    let conn = store.conn()?;
    if !store::notifications::mark_read(&conn, id, session.user_id)? {
        return Err(Error::not_found("notification", id));
    }
    store::notifications::get_for_recipient(&conn, id, session.user_id)?
        .ok_or_else(|| Error::not_found("notification", id))
}

/// Returns how many notifications changed.
pub fn mark_all_read(store: &Store, session: &Session) -> Result<usize> {
    let conn = store.conn()?;
    let updated = store::notifications::mark_all_read(&conn, session.user_id)?;
    info!(user_id = session.user_id, updated, "marked all notifications read");
    Ok(updated)
}

pub fn delete(store: &Store, session: &Session, id: i64) -> Result<()> {
    let conn = store.conn()?;
    if !store::notifications::delete_notification(&conn, id, session.user_id)? {
        return Err(Error::not_found("notification", id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            username: "ann".to_string(),
            email: "ann@example.com".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_texts() {
        let ann = user();
        assert_eq!(friend_request_message(&ann), "Ann Lee sent you a friend request");
        assert_eq!(
            friend_accepted_message(&ann),
            "Ann Lee accepted your friend request"
        );
        assert_eq!(
            bump_message(&ann, "Write report", None),
            "Ann bumped your task \"Write report\""
        );
        assert_eq!(
            bump_message(&ann, "Write report", Some("due soon!")),
            "Ann bumped your task \"Write report\": \"due soon!\""
        );
    }

    #[test]
    fn types_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&NotificationType::FriendAccepted).expect("serialize"),
            "\"friend_accepted\""
        );
        assert_eq!(
            "friend_request".parse::<NotificationType>().expect("parse"),
            NotificationType::FriendRequest
        );
        assert_eq!(NotificationType::parse_lenient("???"), NotificationType::Reminder);
    }
}
