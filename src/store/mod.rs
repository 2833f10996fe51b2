//! SQLite-backed relational store.
//!
//! One connection guarded by a mutex. Row access lives in the submodules
//! as free functions over `&Connection`, so the same calls work inside a
//! transaction (a `Transaction` derefs to `Connection`).

pub mod friendships;
pub mod notifications;
pub mod projects;
pub mod tasks;
pub mod users;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::{Error, Result};

const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: &[&str] = &["users", "projects", "tasks", "friendships", "notifications"];

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    username    TEXT NOT NULL UNIQUE,
    email       TEXT NOT NULL UNIQUE,
    first_name  TEXT NOT NULL,
    last_name   TEXT NOT NULL,
    created_at  INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS projects (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    color       TEXT NOT NULL DEFAULT '#3b82f6',
    description TEXT,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_projects_owner ON projects(owner_id);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id    INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    project_id  INTEGER REFERENCES projects(id) ON DELETE SET NULL,
    title       TEXT NOT NULL,
    done        INTEGER NOT NULL DEFAULT 0,
    priority    TEXT NOT NULL DEFAULT 'Medium',
    due_date    TEXT,
    is_public   INTEGER NOT NULL DEFAULT 0,
    created_at  INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner_id);
CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);

CREATE TABLE IF NOT EXISTS friendships (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    requester_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    addressee_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    status       TEXT NOT NULL DEFAULT 'pending'
                 CHECK (status IN ('pending', 'accepted', 'rejected')),
    created_at   INTEGER NOT NULL,
    updated_at   INTEGER NOT NULL,
    CHECK (requester_id <> addressee_id)
);
-- One row per unordered pair, whichever side asked first.
CREATE UNIQUE INDEX IF NOT EXISTS idx_friendships_pair
    ON friendships(min(requester_id, addressee_id), max(requester_id, addressee_id));
CREATE INDEX IF NOT EXISTS idx_friendships_addressee ON friendships(addressee_id, status);

CREATE TABLE IF NOT EXISTS notifications (
    id             INTEGER PRIMARY KEY AUTOINCREMENT,
    recipient_id   INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    from_user_id   INTEGER REFERENCES users(id) ON DELETE SET NULL,
    kind           TEXT NOT NULL,
    message        TEXT NOT NULL,
    is_read        INTEGER NOT NULL DEFAULT 0,
    reference_id   INTEGER,
    reference_type TEXT,
    created_at     INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_notifications_recipient
    ON notifications(recipient_id, is_read, created_at);
"#;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened database");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.configure_pragmas()?;
        store.initialize_schema()?;
        Ok(store)
    }

    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::OperationFailed("database connection lock poisoned".to_string()))
    }

    /// Run `f` inside a transaction; commits on `Ok`, rolls back on `Err`.
    ///
    /// The write lock is taken up front (`BEGIN IMMEDIATE`), so a second
    /// process waits on the busy timeout and then reads what the first one
    /// committed instead of failing on a stale snapshot.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn schema_version(&self) -> Result<i64> {
        let version = self
            .conn()?
            .pragma_query_value(None, "user_version", |row| row.get(0))?;
        Ok(version)
    }

    fn configure_pragmas(&self) -> Result<()> {
        // journal_mode answers with a row ("memory" for in-memory databases).
        let conn = self.conn()?;
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
        conn.execute_batch(
            "PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("database pragmas configured");
        Ok(())
    }

    fn initialize_schema(&self) -> Result<()> {
        let current_version = self.schema_version()?;
        info!(
            current_version,
            target_version = SCHEMA_VERSION,
            "checking schema version"
        );

        if current_version > SCHEMA_VERSION {
            return Err(Error::OperationFailed(format!(
                "database schema v{current_version} is newer than supported v{SCHEMA_VERSION}"
            )));
        }

        if current_version < SCHEMA_VERSION {
            let conn = self.conn()?;
            conn.execute_batch(SCHEMA_SQL)?;
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
            info!("created database schema v{SCHEMA_VERSION}");
        }

        self.assert_required_tables()
    }

    fn assert_required_tables(&self) -> Result<()> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;

        let mut missing = Vec::new();
        for table in REQUIRED_TABLES {
            if !stmt.exists([table])? {
                missing.push(*table);
            }
        }

        if !missing.is_empty() {
            return Err(Error::OperationFailed(format!(
                "database schema is missing required tables ({})",
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// True when `err` is a UNIQUE/CHECK constraint failure.
pub fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _) if inner.code == ErrorCode::ConstraintViolation
    )
}

/// Current time at the precision the store keeps.
pub(crate) fn now() -> DateTime<Utc> {
    from_millis(to_millis(Utc::now()))
}

pub(crate) fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_creates_schema() {
        let store = Store::open_in_memory().expect("store");
        assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn reopening_file_store_keeps_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("taskmate.db");
        {
            let store = Store::open(&path).expect("open");
            assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
        }
        let store = Store::open(&path).expect("reopen");
        assert_eq!(store.schema_version().expect("version"), SCHEMA_VERSION);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let store = Store::open_in_memory().expect("store");
        let result: Result<()> = store.transaction(|tx| {
            tx.execute(
                "INSERT INTO users (username, email, first_name, last_name, created_at)
                 VALUES ('ann', 'ann@example.com', 'Ann', 'Lee', 0)",
                [],
            )?;
            Err(Error::OperationFailed("boom".to_string()))
        });
        assert!(result.is_err());

        let count: i64 = store
            .conn()
            .expect("conn")
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
            .expect("count");
        assert_eq!(count, 0);
    }

    #[test]
    fn transaction_takes_the_write_lock_up_front() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("taskmate.db");
        let first = Store::open(&path).expect("first");
        let second = Store::open(&path).expect("second");
        second
            .conn()
            .expect("conn")
            .busy_timeout(std::time::Duration::ZERO)
            .expect("timeout");

        first
            .transaction(|_| {
                let err = second
                    .transaction(|_| Ok(()))
                    .expect_err("second writer must wait");
                assert!(matches!(
                    err,
                    Error::Sqlite(rusqlite::Error::SqliteFailure(inner, _))
                        if inner.code == ErrorCode::DatabaseBusy
                ));
                Ok(())
            })
            .expect("first");
        second.transaction(|_| Ok(())).expect("after commit");
    }

    #[test]
    fn now_matches_stored_precision() {
        let now = now();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
        assert_eq!(from_millis(to_millis(now)), now);
    }

    #[test]
    fn millis_round_trip() {
        let now = DateTime::from_timestamp_millis(1_704_067_200_123).expect("ts");
        assert_eq!(from_millis(to_millis(now)), now);
    }
}
