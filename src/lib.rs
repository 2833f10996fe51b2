//! taskmate - personal tasks shared with friends
//!
//! This library provides the core functionality for the tm CLI tool.
//!
//! # Core Concepts
//!
//! - **Tasks**: Owned by one user, optionally public, grouped into projects
//! - **Urgency**: Effective priority rises as a due date approaches
//! - **Friends**: Requests, acceptance and visibility of public tasks
//! - **Bumps**: A friend's nudge about one of your public tasks
//! - **Notifications**: Per-user inbox fed by friend activity and bumps
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `taskmate.toml`
//! - `error`: Error types and result aliases
//! - `store`: SQLite persistence
//! - `session`: Acting-user resolution and login state
//! - `user`, `task`, `project`, `friend`, `bump`, `notification`: domain operations
//! - `priority`, `urgency`, `dashboard`: deadline-aware views over tasks
//! - `search`: Scored user search
//! - `storage`: Data directory layout and atomic file writes

pub mod bump;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod friend;
pub mod notification;
pub mod output;
pub mod priority;
pub mod project;
pub mod search;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod urgency;
pub mod user;

pub use error::{Error, Result};
