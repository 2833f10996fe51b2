//! On-disk layout for taskmate
//!
//! Everything lives in one data directory:
//!
//! ```text
//! <data-dir>/
//!   taskmate.toml     # Optional configuration
//!   taskmate.db       # SQLite database (name configurable)
//!   session.json      # Current login, removed on logout
//! ```
//!
//! Data directory resolution order:
//! 1) CLI `--data-dir`
//! 2) `TASKMATE_DATA_DIR` environment variable
//! 3) Platform data directory

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

pub const DATA_DIR_ENV: &str = "TASKMATE_DATA_DIR";
pub const CONFIG_FILE: &str = "taskmate.toml";
pub const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Storage rooted at the resolved data directory.
    pub fn resolve(cli_dir: Option<&Path>) -> Result<Self> {
        Ok(Self::new(resolve_data_dir(cli_dir)?))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE)
    }

    pub fn session_file(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE)
    }

    /// Database path; relative names are taken from the data directory.
    pub fn database_file(&self, configured: &Path) -> PathBuf {
        if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.data_dir.join(configured)
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    /// Write JSON data atomically (write to temp, then rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        write_atomic(path, json.as_bytes())
    }

    /// Read JSON from `path`; `None` when the file does not exist.
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Remove `path`; returns whether a file was removed.
    pub fn remove_file(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

pub fn resolve_data_dir(cli_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = cli_dir {
        return Ok(dir.to_path_buf());
    }

    if let Ok(env_dir) = std::env::var(DATA_DIR_ENV) {
        let trimmed = env_dir.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    ProjectDirs::from("dev", "taskmate", "taskmate")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::OperationFailed(format!(
                "could not determine a data directory; pass --data-dir or set {DATA_DIR_ENV}"
            ))
        })
}

/// Write data atomically using temp file + rename
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    fs::rename(&temp_path, path)?;
    Ok(())
}
