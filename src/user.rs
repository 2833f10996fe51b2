//! User accounts and public profiles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::friend::{self, RelationStatus};
use crate::session::Session;
use crate::store::{self, is_constraint_violation, Store};
use crate::task::{self, TaskView};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// The fields other users may see.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileStats {
    pub public_tasks: usize,
    pub completed_tasks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub user: UserSummary,
    pub member_since: DateTime<Utc>,
    pub friendship_status: RelationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendship_id: Option<i64>,
    pub tasks: Vec<TaskView>,
    pub stats: ProfileStats,
}

fn required(value: &str, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub fn validate_username(raw: &str) -> Result<String> {
    let username = required(raw, "username")?;
    if username.chars().any(char::is_whitespace) {
        return Err(Error::InvalidArgument(format!(
            "username '{username}' cannot contain whitespace"
        )));
    }
    Ok(username)
}

/// Emails are compared case-insensitively and stored lowercase.
pub fn validate_email(raw: &str) -> Result<String> {
    let email = required(raw, "email")?.to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid {
        return Err(Error::InvalidArgument(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(email)
}

pub fn register(store: &Store, new_user: &NewUser) -> Result<UserRecord> {
    let username = validate_username(&new_user.username)?;
    let email = validate_email(&new_user.email)?;
    let first_name = required(&new_user.first_name, "first name")?;
    let last_name = required(&new_user.last_name, "last name")?;
    let now = store::now();

    let id = store.transaction(|tx| {
        if store::users::get_by_email(tx, &email)?.is_some() {
            return Err(Error::Conflict("email already in use".to_string()));
        }
        if store::users::get_by_username(tx, &username)?.is_some() {
            return Err(Error::Conflict("username already in use".to_string()));
        }
        store::users::insert_user(tx, &username, &email, &first_name, &last_name, now).map_err(
            |err| match err {
                Error::Sqlite(inner) if is_constraint_violation(&inner) => {
                    Error::Conflict("username or email already in use".to_string())
                }
                other => other,
            },
        )
    })?;

    info!(user_id = id, username = %username, "registered user");
    Ok(UserRecord {
        id,
        username,
        email,
        first_name,
        last_name,
        created_at: now,
    })
}

pub fn get_user(store: &Store, id: i64) -> Result<UserRecord> {
    let conn = store.conn()?;
    store::users::get_user(&conn, id)?.ok_or_else(|| Error::not_found("user", id))
}

/// Public profile of `username` as seen by the session user.
pub fn profile(store: &Store, session: &Session, username: &str) -> Result<Profile> {
    let now = Utc::now();
    let conn = store.conn()?;
    let user = store::users::get_by_username(&conn, username.trim())?
        .ok_or_else(|| Error::not_found("user", username.trim()))?;

    let friendship = store::friendships::find_between(&conn, session.user_id, user.id)?;
    let friendship_status = friendship
        .as_ref()
        .map(|row| friend::relation_for(row, session.user_id))
        .unwrap_or(RelationStatus::None);

    let tasks: Vec<TaskView> = store::tasks::list_public(&conn, user.id)?
        .into_iter()
        .map(|record| task::TaskView::new(record, now))
        .collect();
    let stats = ProfileStats {
        public_tasks: tasks.len(),
        completed_tasks: tasks.iter().filter(|view| view.task.done).count(),
    };

    Ok(Profile {
        user: user.summary(),
        member_since: user.created_at,
        friendship_status,
        friendship_id: friendship
            .filter(|_| friendship_status != RelationStatus::None)
            .map(|row| row.id),
        tasks,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
        }
    }

    #[test]
    fn register_trims_and_lowercases() {
        let store = Store::open_in_memory().expect("store");
        let user = register(&store, &new_user("  ann ", "Ann@Example.COM")).expect("register");
        assert_eq!(user.username, "ann");
        assert_eq!(user.email, "ann@example.com");
        assert_eq!(get_user(&store, user.id).expect("lookup"), user);
    }

    #[test]
    fn duplicate_email_or_username_conflicts() {
        let store = Store::open_in_memory().expect("store");
        register(&store, &new_user("ann", "ann@example.com")).expect("register");

        let err = register(&store, &new_user("other", "ANN@example.com")).expect_err("email");
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("email")));

        let err = register(&store, &new_user("ann", "new@example.com")).expect_err("username");
        assert!(matches!(err, Error::Conflict(ref msg) if msg.contains("username")));
    }

    #[test]
    fn register_validates_fields() {
        let store = Store::open_in_memory().expect("store");
        for (username, email) in [("", "a@b.co"), ("a b", "a@b.co"), ("ann", "nope"), ("ann", "a@b")] {
            let err = register(&store, &new_user(username, email)).expect_err("invalid");
            assert!(matches!(err, Error::InvalidArgument(_)), "{username} {email}");
        }
        let mut blank = new_user("ann", "ann@example.com");
        blank.last_name = "   ".to_string();
        assert!(matches!(
            register(&store, &blank),
            Err(Error::InvalidArgument(_))
        ));
    }
}
