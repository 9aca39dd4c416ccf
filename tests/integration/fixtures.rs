//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - Building script trees in temporary directories
//! - A recording backend with scripted failures and delays

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempfile::TempDir;

use scriptflow::backend::ScriptBackend;
use scriptflow::{Config, Error, Result};

/// A script tree rooted in a temporary directory.
pub struct ScriptTree {
    temp_dir: TempDir,
}

impl ScriptTree {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a script file at a path relative to the root, creating
    /// intermediate directories. `dir/file.sql` builds a branch.
    pub fn script(&self, relative: &str, content: &str) -> &Self {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create script directory");
        }
        std::fs::write(&path, content).expect("Failed to write script");
        self
    }

    /// Create an empty directory relative to the root.
    pub fn dir(&self, relative: &str) -> &Self {
        std::fs::create_dir_all(self.root().join(relative)).expect("Failed to create directory");
        self
    }

    /// A config pointing at this tree with a short poll interval.
    pub fn config(&self) -> Config {
        Config {
            root: Some(PathBuf::from(self.root())),
            poll_interval_secs: 1,
            ..Config::default()
        }
    }
}

/// Backend that records every statement it runs, in execution order.
///
/// Statement prefixes script the behavior:
/// - `fail:` makes the statement report failure
/// - `sleep:<ms>` pauses that long before recording
pub struct RecordingBackend {
    statements: Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            statements: Mutex::new(Vec::new()),
        })
    }

    /// Statements recorded so far, in the order they ran.
    pub fn recorded(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    /// Position of the first recorded statement containing `needle`.
    pub fn position_of(&self, needle: &str) -> Option<usize> {
        self.recorded().iter().position(|s| s.contains(needle))
    }
}

impl ScriptBackend for RecordingBackend {
    fn run_statement(&self, statement: &str) -> Result<()> {
        if let Some(rest) = statement.strip_prefix("sleep:") {
            let ms: u64 = rest
                .split_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            std::thread::sleep(Duration::from_millis(ms));
        }
        self.statements.lock().unwrap().push(statement.to_string());
        if statement.starts_with("fail:") {
            return Err(Error::Backend("simulated failure".to_string()));
        }
        Ok(())
    }
}
