//! Session identity.
//!
//! Every operation receives the acting user as an explicit [`Session`].
//!
//! Resolution order:
//! 1) CLI `--user` (username or email)
//! 2) `TASKMATE_USER` environment variable
//! 3) Persisted login in `session.json`
//! 4) Config default (`session.default_user`)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;
use crate::store::{self, Store};
use crate::user::UserRecord;

pub const USER_ENV: &str = "TASKMATE_USER";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: i64,
    pub username: String,
    pub token: Uuid,
    pub started_at: DateTime<Utc>,
}

/// Where the session came from, for `tm whoami`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionSource {
    Flag,
    Environment,
    Login,
    ConfigDefault,
}

impl Session {
    pub fn for_user(user: &UserRecord) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            token: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

/// Resolve the acting user; `NoSession` when nothing names one.
pub fn resolve(
    store: &Store,
    storage: &Storage,
    config: &Config,
    cli_user: Option<&str>,
) -> Result<(Session, SessionSource)> {
    if let Some(user) = non_empty(cli_user) {
        return Ok((session_for(store, user)?, SessionSource::Flag));
    }

    if let Ok(env_user) = std::env::var(USER_ENV) {
        if let Some(user) = non_empty(Some(env_user.as_str())) {
            return Ok((session_for(store, user)?, SessionSource::Environment));
        }
    }

    if let Some(session) = load_persisted(store, storage)? {
        return Ok((session, SessionSource::Login));
    }

    if let Some(user) = non_empty(config.session.default_user.as_deref()) {
        return Ok((session_for(store, user)?, SessionSource::ConfigDefault));
    }

    Err(Error::NoSession)
}

/// Start a session for `username_or_email` and persist it.
pub fn login(store: &Store, storage: &Storage, username_or_email: &str) -> Result<Session> {
    let value = non_empty(Some(username_or_email))
        .ok_or_else(|| Error::InvalidArgument("username cannot be empty".to_string()))?;
    let session = session_for(store, value)?;
    storage.write_json(&storage.session_file(), &session)?;
    info!(user_id = session.user_id, username = %session.username, "logged in");
    Ok(session)
}

/// End the persisted session, returning it when one existed.
pub fn logout(storage: &Storage) -> Result<Option<Session>> {
    let path = storage.session_file();
    let session = match storage.read_json::<Session>(&path) {
        Ok(session) => session,
        Err(err) => {
            debug!(error = %err, path = %path.display(), "discarding unreadable session file");
            None
        }
    };
    let removed = storage.remove_file(&path)?;
    if removed {
        info!("logged out");
    }
    Ok(session)
}

/// The persisted session, if its user still exists.
pub fn load_persisted(store: &Store, storage: &Storage) -> Result<Option<Session>> {
    let Some(session) = storage.read_json::<Session>(&storage.session_file())? else {
        return Ok(None);
    };
    let conn = store.conn()?;
    match store::users::get_user(&conn, session.user_id)? {
        Some(user) if user.username == session.username => Ok(Some(session)),
        _ => {
            debug!(user_id = session.user_id, "persisted session names a missing user");
            Ok(None)
        }
    }
}

fn session_for(store: &Store, username_or_email: &str) -> Result<Session> {
    let conn = store.conn()?;
    let user = store::users::get_by_username_or_email(&conn, username_or_email)?
        .ok_or_else(|| Error::not_found("user", username_or_email))?;
    Ok(Session::for_user(&user))
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
