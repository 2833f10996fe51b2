//! Configuration loading and management
//!
//! Handles parsing of `taskmate.toml` in the data directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::project::is_hex_color;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub projects: ProjectsConfig,
}

/// Database location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, relative to the data directory unless absolute
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from("taskmate.db")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Username used when no login, `--user` or `TASKMATE_USER` is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Maximum notifications returned by a listing
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

fn default_list_limit() -> usize {
    50
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            list_limit: default_list_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,

    /// Results returned after scoring
    #[serde(default = "default_result_limit")]
    pub result_limit: usize,

    /// Rows fetched from the store before scoring
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

fn default_min_query_len() -> usize {
    2
}

fn default_result_limit() -> usize {
    20
}

fn default_candidate_limit() -> usize {
    200
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
            result_limit: default_result_limit(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default = "default_color")]
    pub default_color: String,
}

fn default_color() -> String {
    "#3b82f6".to_string()
}

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self {
            default_color: default_color(),
        }
    }
}

impl Config {
    /// Load configuration from a `taskmate.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `config_path`, falling back to defaults when the file is absent.
    ///
    /// A present but invalid file is an error.
    pub fn load_or_default(config_path: &Path) -> crate::error::Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.store.database.as_os_str().is_empty() {
            return Err(invalid("store.database cannot be empty"));
        }
        if let Some(user) = &self.session.default_user {
            if user.trim().is_empty() {
                return Err(invalid("session.default_user cannot be blank"));
            }
        }
        if self.notifications.list_limit == 0 {
            return Err(invalid("notifications.list_limit must be at least 1"));
        }
        self.search.validate()?;
        if !is_hex_color(&self.projects.default_color) {
            return Err(invalid(&format!(
                "projects.default_color '{}' is not a hex color like #3b82f6",
                self.projects.default_color
            )));
        }
        Ok(())
    }
}

impl SearchConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.min_query_len == 0 {
            return Err(invalid("search.min_query_len must be at least 1"));
        }
        if self.result_limit == 0 {
            return Err(invalid("search.result_limit must be at least 1"));
        }
        if self.candidate_limit < self.result_limit {
            return Err(invalid(
                "search.candidate_limit must be at least search.result_limit",
            ));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> crate::error::Error {
    crate::error::Error::InvalidConfig(message.to_string())
}
