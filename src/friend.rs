//! Friend relationships.
//!
//! One row per unordered pair of users, carrying the direction of the
//! original request:
//!
//! ```text
//! none --request--> pending --accept--> accepted --remove--> none
//!                      |
//!                      +----reject--> rejected --request--> pending
//! ```
//!
//! Only the addressee answers a pending request. Either party may remove
//! an accepted friendship. A rejected row reads as "no relationship" and
//! is replaced by the next request between the pair.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::notification::{self, NotificationType, Reference, REFERENCE_FRIEND};
use crate::session::Session;
use crate::store::{self, is_constraint_violation, Store};
use crate::task::TaskView;
use crate::user::{UserRecord, UserSummary};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendshipStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
            FriendshipStatus::Rejected => "rejected",
        }
    }

    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or(FriendshipStatus::Rejected)
    }
}

impl fmt::Display for FriendshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FriendshipStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(FriendshipStatus::Pending),
            "accepted" => Ok(FriendshipStatus::Accepted),
            "rejected" => Ok(FriendshipStatus::Rejected),
            other => Err(Error::InvalidArgument(format!(
                "unknown friendship status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendshipRecord {
    pub id: i64,
    pub requester_id: i64,
    pub addressee_id: i64,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendshipRecord {
    pub fn involves(&self, user_id: i64) -> bool {
        self.requester_id == user_id || self.addressee_id == user_id
    }

    pub fn other_party(&self, user_id: i64) -> i64 {
        if self.requester_id == user_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }
}

/// Relationship as seen from one side.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationStatus {
    None,
    PendingSent,
    PendingReceived,
    Friends,
}

impl RelationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationStatus::None => "none",
            RelationStatus::PendingSent => "pending_sent",
            RelationStatus::PendingReceived => "pending_received",
            RelationStatus::Friends => "friends",
        }
    }
}

impl fmt::Display for RelationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn relation_for(row: &FriendshipRecord, viewer_id: i64) -> RelationStatus {
    match row.status {
        FriendshipStatus::Accepted => RelationStatus::Friends,
        FriendshipStatus::Pending if row.requester_id == viewer_id => RelationStatus::PendingSent,
        FriendshipStatus::Pending => RelationStatus::PendingReceived,
        FriendshipStatus::Rejected => RelationStatus::None,
    }
}

/// What a new request does to the pair's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendAction {
    Insert,
    /// Drop the rejected row with this id, then insert.
    ReplaceRejected(i64),
}

pub fn check_send(
    requester_id: i64,
    addressee_id: i64,
    existing: Option<&FriendshipRecord>,
) -> Result<SendAction> {
    if requester_id == addressee_id {
        return Err(Error::InvalidTarget(
            "cannot send a friend request to yourself".to_string(),
        ));
    }
    match existing {
        None => Ok(SendAction::Insert),
        Some(row) => match row.status {
            FriendshipStatus::Accepted => Err(Error::AlreadyExists(
                "already friends with this user".to_string(),
            )),
            FriendshipStatus::Pending => Err(Error::AlreadyExists(
                "friend request already pending".to_string(),
            )),
            FriendshipStatus::Rejected => Ok(SendAction::ReplaceRejected(row.id)),
        },
    }
}

/// Accept/reject guard: a pending row addressed to the caller.
pub fn check_respond(row: Option<&FriendshipRecord>, caller_id: i64, id: i64) -> Result<()> {
    match row {
        Some(row) if row.addressee_id == caller_id && row.status == FriendshipStatus::Pending => {
            Ok(())
        }
        _ => Err(Error::not_found("friend request", id)),
    }
}

/// Remove guard: an accepted row the caller is part of.
pub fn check_remove(row: Option<&FriendshipRecord>, caller_id: i64, id: i64) -> Result<()> {
    match row {
        Some(row) if row.involves(caller_id) && row.status == FriendshipStatus::Accepted => Ok(()),
        _ => Err(Error::not_found("friendship", id)),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FriendRequest {
    pub friendship: FriendshipRecord,
    pub addressee: UserSummary,
}

/// A friendship or pending request, with the user on the other side.
#[derive(Debug, Clone, Serialize)]
pub struct FriendEntry {
    pub friendship_id: i64,
    pub user: UserSummary,
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationView {
    pub user: UserSummary,
    pub status: RelationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendship_id: Option<i64>,
}

fn require_user(conn: &rusqlite::Connection, id: i64) -> Result<UserRecord> {
    store::users::get_user(conn, id)?.ok_or_else(|| Error::not_found("user", id))
}

/// Send a request to the user named by `target` (username or email).
pub fn send_request(store: &Store, session: &Session, target: &str) -> Result<FriendRequest> {
    let target = target.trim();
    if target.is_empty() {
        return Err(Error::InvalidArgument(
            "username or email is required".to_string(),
        ));
    }

    let result = store.transaction(|tx| {
        let requester = require_user(tx, session.user_id)?;
        let addressee = store::users::get_by_username_or_email(tx, target)?
            .ok_or_else(|| Error::not_found("user", target))?;

        let existing = store::friendships::find_between(tx, requester.id, addressee.id)?;
        if let SendAction::ReplaceRejected(old_id) =
            check_send(requester.id, addressee.id, existing.as_ref())?
        {
            store::friendships::delete_friendship(tx, old_id)?;
        }

        let now = store::now();
        let id = store::friendships::insert_pending(tx, requester.id, addressee.id, now)?;
        notification::emit(
            tx,
            addressee.id,
            &requester,
            NotificationType::FriendRequest,
            &notification::friend_request_message(&requester),
            Some(Reference {
                id,
                kind: REFERENCE_FRIEND,
            }),
        )?;

        Ok(FriendRequest {
            friendship: FriendshipRecord {
                id,
                requester_id: requester.id,
                addressee_id: addressee.id,
                status: FriendshipStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            addressee: addressee.summary(),
        })
    });

    // A concurrent request for the same pair loses on the unique pair index.
    let request = result.map_err(|err| match err {
        Error::Sqlite(inner) if is_constraint_violation(&inner) => {
            Error::AlreadyExists("friend request already pending".to_string())
        }
        other => other,
    })?;
    info!(
        friendship_id = request.friendship.id,
        requester_id = session.user_id,
        addressee_id = request.addressee.id,
        "sent friend request"
    );
    Ok(request)
}

pub fn accept_request(store: &Store, session: &Session, id: i64) -> Result<FriendshipRecord> {
    let row = store.transaction(|tx| {
        let row = store::friendships::get_friendship(tx, id)?;
        check_respond(row.as_ref(), session.user_id, id)?;
        let now = store::now();
        if !store::friendships::resolve_pending(
            tx,
            id,
            session.user_id,
            FriendshipStatus::Accepted,
            now,
        )? {
            return Err(Error::not_found("friend request", id));
        }
        let mut row = row.ok_or_else(|| Error::not_found("friend request", id))?;
        row.status = FriendshipStatus::Accepted;
        row.updated_at = now;

        let accepter = require_user(tx, session.user_id)?;
        notification::emit(
            tx,
            row.requester_id,
            &accepter,
            NotificationType::FriendAccepted,
            &notification::friend_accepted_message(&accepter),
            Some(Reference {
                id,
                kind: REFERENCE_FRIEND,
            }),
        )?;
        Ok(row)
    })?;
    info!(friendship_id = id, "accepted friend request");
    Ok(row)
}

pub fn reject_request(store: &Store, session: &Session, id: i64) -> Result<FriendshipRecord> {
    let row = store.transaction(|tx| {
        let row = store::friendships::get_friendship(tx, id)?;
        check_respond(row.as_ref(), session.user_id, id)?;
        let now = store::now();
        if !store::friendships::resolve_pending(
            tx,
            id,
            session.user_id,
            FriendshipStatus::Rejected,
            now,
        )? {
            return Err(Error::not_found("friend request", id));
        }
        let mut row = row.ok_or_else(|| Error::not_found("friend request", id))?;
        row.status = FriendshipStatus::Rejected;
        row.updated_at = now;
        Ok(row)
    })?;
    info!(friendship_id = id, "rejected friend request");
    Ok(row)
}

pub fn remove_friend(store: &Store, session: &Session, id: i64) -> Result<()> {
    store.transaction(|tx| {
        let row = store::friendships::get_friendship(tx, id)?;
        check_remove(row.as_ref(), session.user_id, id)?;
        store::friendships::delete_friendship(tx, id)?;
        Ok(())
    })?;
    info!(friendship_id = id, "removed friend");
    Ok(())
}

fn entries(
    conn: &rusqlite::Connection,
    rows: Vec<FriendshipRecord>,
    viewer_id: i64,
    use_updated: bool,
) -> Result<Vec<FriendEntry>> {
    rows.into_iter()
        .map(|row| {
            let other = require_user(conn, row.other_party(viewer_id))?;
            Ok(FriendEntry {
                friendship_id: row.id,
                user: other.summary(),
                since: if use_updated { row.updated_at } else { row.created_at },
            })
        })
        .collect()
}

pub fn list_friends(store: &Store, session: &Session) -> Result<Vec<FriendEntry>> {
    let conn = store.conn()?;
    let rows = store::friendships::list_accepted(&conn, session.user_id)?;
    entries(&conn, rows, session.user_id, true)
}

/// Pending requests addressed to the caller.
pub fn incoming_requests(store: &Store, session: &Session) -> Result<Vec<FriendEntry>> {
    let conn = store.conn()?;
    let rows = store::friendships::list_incoming(&conn, session.user_id)?;
    entries(&conn, rows, session.user_id, false)
}

/// Pending requests the caller sent.
pub fn sent_requests(store: &Store, session: &Session) -> Result<Vec<FriendEntry>> {
    let conn = store.conn()?;
    let rows = store::friendships::list_sent(&conn, session.user_id)?;
    entries(&conn, rows, session.user_id, false)
}

pub fn relation_with(store: &Store, session: &Session, username: &str) -> Result<RelationView> {
    let conn = store.conn()?;
    let other = store::users::get_by_username(&conn, username.trim())?
        .ok_or_else(|| Error::not_found("user", username.trim()))?;
    let row = store::friendships::find_between(&conn, session.user_id, other.id)?;
    let status = row
        .as_ref()
        .map(|row| relation_for(row, session.user_id))
        .unwrap_or(RelationStatus::None);
    Ok(RelationView {
        user: other.summary(),
        status,
        friendship_id: row
            .filter(|_| status != RelationStatus::None)
            .map(|row| row.id),
    })
}

pub fn are_friends(conn: &rusqlite::Connection, a: i64, b: i64) -> Result<bool> {
    Ok(store::friendships::find_between(conn, a, b)?
        .is_some_and(|row| row.status == FriendshipStatus::Accepted))
}

/// Public tasks of an accepted friend, soonest due first.
pub fn friend_public_tasks(
    store: &Store,
    session: &Session,
    username: &str,
) -> Result<Vec<TaskView>> {
    let now = Utc::now();
    let conn = store.conn()?;
    let friend = store::users::get_by_username(&conn, username.trim())?
        .ok_or_else(|| Error::not_found("user", username.trim()))?;
    if !are_friends(&conn, session.user_id, friend.id)? {
        return Err(Error::Unauthorized(format!(
            "you are not friends with {}",
            friend.username
        )));
    }
    Ok(store::tasks::list_public(&conn, friend.id)?
        .into_iter()
        .map(|task| TaskView::new(task, now))
        .collect())
}
