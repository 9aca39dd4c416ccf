use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{sflog_debug, Error, Result};

fn default_poll_interval() -> u64 {
    10
}

fn default_suffix() -> String {
    ".sql".to_string()
}

/// Notification settings. Messages are delivered by spawning `command`
/// with the subject and body in its environment; delivery is
/// fire-and-forget.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NotifyConfig {
    pub command: Option<String>,
    #[serde(default)]
    pub on_success: bool,
    #[serde(default)]
    pub on_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root directory of the job configuration tree.
    pub root: Option<PathBuf>,
    /// Parse and walk the tree but skip real script execution.
    #[serde(default)]
    pub dry_run: bool,
    /// Poll cadence, in seconds, for barrier joins and the driver wait.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Filename suffix that marks a script file (matched case-insensitively).
    #[serde(default = "default_suffix")]
    pub script_suffix: String,
    /// Parameters substituted into scripts as `${name}`.
    #[serde(default)]
    pub params: HashMap<String, String>,
    /// Command each statement is piped to; exit status 0 means success.
    pub backend_command: Option<String>,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: None,
            dry_run: false,
            poll_interval_secs: default_poll_interval(),
            script_suffix: default_suffix(),
            params: HashMap::new(),
            backend_command: None,
            notify: NotifyConfig::default(),
        }
    }
}

impl Config {
    pub fn config_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".scriptflow"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("scriptflow.toml"))
    }

    /// Poll interval as a duration.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Load the config from the default location, falling back to
    /// defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load the config from an explicit path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        sflog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            sflog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        sflog_debug!(
            "Config loaded: root={:?}, dry_run={}, poll_interval_secs={}",
            config.root,
            config.dry_run,
            config.poll_interval_secs
        );
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir()?;
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        let path = Self::config_path()?;
        fs::write(&path, toml::to_string_pretty(self)?)?;
        sflog_debug!("Config saved to {}", path.display());
        Ok(())
    }
}
