use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// An isolated data directory for driving the `tm` binary.
pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join("taskmate.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `tm` pointed at this data directory with no ambient user.
    pub fn tm(&self) -> Command {
        let mut cmd = Command::cargo_bin("tm").expect("binary");
        cmd.env("TASKMATE_DATA_DIR", self.dir.path())
            .env_remove("TASKMATE_USER")
            .env_remove("RUST_LOG");
        cmd
    }

    /// `tm --user <user> ...`
    pub fn tm_as(&self, user: &str) -> Command {
        let mut cmd = self.tm();
        cmd.args(["--user", user]);
        cmd
    }

    /// Run a command expected to succeed with `--json` and return its `data`.
    pub fn json_as(&self, user: &str, args: &[&str]) -> Value {
        let output = self
            .tm_as(user)
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("json envelope");
        assert_eq!(value["status"], "success");
        value["data"].clone()
    }

    /// Register `username` with a derived email and return the user id.
    pub fn register(&self, username: &str, first: &str, last: &str) -> i64 {
        let email = format!("{username}@example.com");
        let output = self
            .tm()
            .args([
                "user", "register", username, "--email", &email, "--first", first, "--last", last,
                "--json",
            ])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        let value: Value = serde_json::from_slice(&output).expect("register json");
        value["data"]["user"]["id"].as_i64().expect("user id")
    }
}

pub fn error_envelope(stdout: &[u8]) -> Value {
    let value: Value = serde_json::from_slice(stdout).expect("error json");
    assert_eq!(value["status"], "error");
    value["error"].clone()
}
