//! Error types for taskmate
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (validation, missing records)
//! - 3: Blocked by policy (missing relationship, conflicting request)
//! - 4: Operation failed (storage, IO)

use thiserror::Error;

/// Exit codes for the tm CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const POLICY_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for taskmate operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    #[error("Cannot bump your own task")]
    SelfBump,

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Not logged in")]
    NoSession,

    // Policy blocks (exit code 3)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Cannot bump a private task")]
    PrivateTask,

    #[error("You can only bump tasks from friends")]
    NotFriends,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Friend request already exists: {0}")]
    AlreadyExists(String),

    // Operation failures (exit code 4)
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

impl Error {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            // User errors
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::InvalidTarget(_)
            | Error::SelfBump
            | Error::NotFound { .. }
            | Error::NoSession => exit_codes::USER_ERROR,

            // Policy blocks
            Error::Unauthorized(_)
            | Error::PrivateTask
            | Error::NotFriends
            | Error::Conflict(_)
            | Error::AlreadyExists(_) => exit_codes::POLICY_BLOCKED,

            // Operation failures
            Error::Sqlite(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::OperationFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Error class as surfaced to callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidArgument(_)
            | Error::InvalidConfig(_)
            | Error::InvalidTarget(_)
            | Error::SelfBump => "validation",
            Error::NotFound { .. } => "not_found",
            Error::NoSession
            | Error::Unauthorized(_)
            | Error::PrivateTask
            | Error::NotFriends => "unauthorized",
            Error::Conflict(_) | Error::AlreadyExists(_) => "conflict",
            Error::Sqlite(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::OperationFailed(_) => "server",
        }
    }

    /// Structured fields for JSON error output.
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::NotFound { entity, id } => Some(serde_json::json!({
                "entity": entity,
                "id": id,
            })),
            Error::InvalidArgument(message)
            | Error::InvalidConfig(message)
            | Error::InvalidTarget(message)
            | Error::Unauthorized(message)
            | Error::Conflict(message)
            | Error::AlreadyExists(message) => Some(serde_json::json!({
                "message": message,
            })),
            _ => None,
        }
    }
}

/// Result type alias for taskmate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub kind: &'static str,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            kind: err.kind(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
