//! Command-line interface for tm
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::debug;

use crate::config::Config;
use crate::error::Result;
use crate::output::OutputOptions;
use crate::session::{self, Session, SessionSource};
use crate::storage::Storage;
use crate::store::Store;

mod bump;
mod friend;
mod login;
mod notify;
mod project;
mod task;
mod user;

/// tm - taskmate
///
/// Personal tasks with deadline-aware urgency, projects, friends who can
/// see your public tasks, and bumps.
#[derive(Parser, Debug)]
#[command(name = "tm")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Data directory (defaults to TASKMATE_DATA_DIR, then the platform data dir)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Act as this user (username or email) instead of the logged-in one
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a session as an existing user
    Login {
        /// Username or email
        #[arg(value_name = "USER")]
        username_or_email: String,
    },

    /// End the current session
    Logout,

    /// Show the acting user
    Whoami,

    /// Accounts, search and profiles
    #[command(subcommand)]
    User(UserCommands),

    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Project management
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Friends and friend requests
    #[command(subcommand)]
    Friend(FriendCommands),

    /// Nudge a friend about one of their public tasks
    Bump {
        /// Task ID
        task_id: i64,

        /// Short note appended to the notification
        #[arg(long)]
        note: Option<String>,
    },

    /// Notifications
    #[command(subcommand)]
    Notify(NotifyCommands),
}

#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// Create an account
    Register {
        username: String,

        #[arg(long)]
        email: String,

        /// First name
        #[arg(long = "first")]
        first_name: String,

        /// Last name
        #[arg(long = "last")]
        last_name: String,

        /// Log in as the new user
        #[arg(long)]
        login: bool,
    },

    /// Search other users by username or name
    Search {
        query: String,
    },

    /// Show a user's public profile
    Profile {
        username: String,
    },
}

#[derive(Args, Debug)]
pub struct DueArgs {
    /// Due date: YYYY-MM-DD, today, tomorrow or +Nd
    #[arg(long)]
    pub due: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        title: String,

        /// low, medium, high or urgent
        #[arg(short, long)]
        priority: Option<String>,

        #[command(flatten)]
        due: DueArgs,

        /// Visible to friends
        #[arg(long)]
        public: bool,

        /// Project ID
        #[arg(long)]
        project: Option<i64>,
    },

    /// Change task fields
    Edit {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(short, long)]
        priority: Option<String>,

        #[command(flatten)]
        due: DueArgs,

        /// Remove the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,

        #[arg(long, conflicts_with = "private")]
        public: bool,

        #[arg(long)]
        private: bool,
    },

    /// Mark a task done
    Done { id: i64 },

    /// Mark a task not done
    Undone { id: i64 },

    /// Delete a task
    Rm { id: i64 },

    /// List your tasks
    List {
        /// Only tasks in this project
        #[arg(long, conflicts_with = "unassigned")]
        project: Option<i64>,

        /// Only tasks outside any project
        #[arg(long)]
        unassigned: bool,

        /// Hide completed tasks
        #[arg(long)]
        open: bool,
    },

    /// Show one task with its effective priority
    Show { id: i64 },

    /// Tasks grouped by when they are due
    Dashboard,
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// Create a project
    Create {
        name: String,

        /// Hex color, e.g. #3b82f6
        #[arg(long)]
        color: Option<String>,

        #[arg(long)]
        description: Option<String>,
    },

    /// List your projects
    List,

    /// Show a project and its tasks
    Show { id: i64 },

    /// Change project fields
    Edit {
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        color: Option<String>,

        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        #[arg(long)]
        clear_description: bool,
    },

    /// Delete a project; its tasks are kept
    Delete { id: i64 },

    /// Move a task into a project, or out with --none
    Move {
        task_id: i64,

        /// Destination project ID
        #[arg(long, required_unless_present = "none", conflicts_with = "none")]
        to: Option<i64>,

        /// Remove the task from its project
        #[arg(long)]
        none: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum FriendCommands {
    /// Send a friend request
    Request {
        /// Username or email
        #[arg(value_name = "USER")]
        target: String,
    },

    /// Accept a friend request
    Accept { id: i64 },

    /// Reject a friend request
    Reject { id: i64 },

    /// Remove a friend
    Remove { id: i64 },

    /// List friends
    List,

    /// Pending requests sent to you
    Requests,

    /// Pending requests you sent
    Sent,

    /// Relationship with a user
    Status { username: String },

    /// A friend's public tasks
    Tasks { username: String },
}

#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List notifications, newest first
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,

        /// Maximum number shown (defaults to notifications.list_limit)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Count unread notifications
    Unread,

    /// Mark a notification read
    Read { id: i64 },

    /// Mark all notifications read
    ReadAll,

    /// Delete a notification
    Rm { id: i64 },
}

/// Options shared by every command.
#[derive(Debug, Clone)]
pub struct Globals {
    pub data_dir: Option<PathBuf>,
    pub user: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl Globals {
    pub fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }
}

/// Storage, configuration and database for one invocation.
pub(crate) struct AppContext {
    pub storage: Storage,
    pub config: Config,
    pub store: Store,
}

impl AppContext {
    pub fn open(globals: &Globals) -> Result<Self> {
        let storage = Storage::resolve(globals.data_dir.as_deref())?;
        storage.ensure_dir()?;
        let config = Config::load_or_default(&storage.config_file())?;
        let db_path = storage.database_file(&config.store.database);
        debug!(data_dir = %storage.data_dir().display(), "opening taskmate store");
        let store = Store::open(&db_path)?;
        Ok(Self {
            storage,
            config,
            store,
        })
    }

    pub fn resolve_session(&self, globals: &Globals) -> Result<(Session, SessionSource)> {
        session::resolve(
            &self.store,
            &self.storage,
            &self.config,
            globals.user.as_deref(),
        )
    }

    pub fn session(&self, globals: &Globals) -> Result<Session> {
        self.resolve_session(globals).map(|(session, _)| session)
    }
}

pub(crate) fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let globals = Globals {
            data_dir: self.data_dir,
            user: self.user,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::Login { username_or_email } => {
                login::run_login(&globals, &username_or_email)
            }
            Commands::Logout => login::run_logout(&globals),
            Commands::Whoami => login::run_whoami(&globals),
            Commands::User(cmd) => match cmd {
                UserCommands::Register {
                    username,
                    email,
                    first_name,
                    last_name,
                    login,
                } => user::run_register(
                    &globals,
                    user::RegisterOptions {
                        username,
                        email,
                        first_name,
                        last_name,
                        login,
                    },
                ),
                UserCommands::Search { query } => user::run_search(&globals, &query),
                UserCommands::Profile { username } => user::run_profile(&globals, &username),
            },
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    priority,
                    due,
                    public,
                    project,
                } => task::run_add(
                    &globals,
                    task::AddOptions {
                        title,
                        priority,
                        due: due.due,
                        public,
                        project,
                    },
                ),
                TaskCommands::Edit {
                    id,
                    title,
                    priority,
                    due,
                    clear_due,
                    public,
                    private,
                } => task::run_edit(
                    &globals,
                    task::EditOptions {
                        id,
                        title,
                        priority,
                        due: due.due,
                        clear_due,
                        public,
                        private,
                    },
                ),
                TaskCommands::Done { id } => task::run_set_done(&globals, id, true),
                TaskCommands::Undone { id } => task::run_set_done(&globals, id, false),
                TaskCommands::Rm { id } => task::run_rm(&globals, id),
                TaskCommands::List {
                    project,
                    unassigned,
                    open,
                } => task::run_list(
                    &globals,
                    task::ListOptions {
                        project,
                        unassigned,
                        open,
                    },
                ),
                TaskCommands::Show { id } => task::run_show(&globals, id),
                TaskCommands::Dashboard => task::run_dashboard(&globals),
            },
            Commands::Project(cmd) => match cmd {
                ProjectCommands::Create {
                    name,
                    color,
                    description,
                } => project::run_create(
                    &globals,
                    project::CreateOptions {
                        name,
                        color,
                        description,
                    },
                ),
                ProjectCommands::List => project::run_list(&globals),
                ProjectCommands::Show { id } => project::run_show(&globals, id),
                ProjectCommands::Edit {
                    id,
                    name,
                    color,
                    description,
                    clear_description,
                } => project::run_edit(
                    &globals,
                    project::EditOptions {
                        id,
                        name,
                        color,
                        description,
                        clear_description,
                    },
                ),
                ProjectCommands::Delete { id } => project::run_delete(&globals, id),
                ProjectCommands::Move { task_id, to, none } => {
                    project::run_move(&globals, task_id, if none { None } else { to })
                }
            },
            Commands::Friend(cmd) => match cmd {
                FriendCommands::Request { target } => friend::run_request(&globals, &target),
                FriendCommands::Accept { id } => friend::run_accept(&globals, id),
                FriendCommands::Reject { id } => friend::run_reject(&globals, id),
                FriendCommands::Remove { id } => friend::run_remove(&globals, id),
                FriendCommands::List => friend::run_list(&globals),
                FriendCommands::Requests => friend::run_requests(&globals),
                FriendCommands::Sent => friend::run_sent(&globals),
                FriendCommands::Status { username } => friend::run_status(&globals, &username),
                FriendCommands::Tasks { username } => friend::run_tasks(&globals, &username),
            },
            Commands::Bump { task_id, note } => bump::run(&globals, task_id, note.as_deref()),
            Commands::Notify(cmd) => match cmd {
                NotifyCommands::List { unread, limit } => notify::run_list(&globals, unread, limit),
                NotifyCommands::Unread => notify::run_unread(&globals),
                NotifyCommands::Read { id } => notify::run_read(&globals, id),
                NotifyCommands::ReadAll => notify::run_read_all(&globals),
                NotifyCommands::Rm { id } => notify::run_rm(&globals, id),
            },
        }
    }
}
