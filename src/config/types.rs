//! Configuration type definitions

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Project configuration as written in `stagehand.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,

    #[serde(default)]
    pub home: HomeConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Defaults to the project directory name
    #[serde(default)]
    pub name: Option<String>,
}

/// Where shared deployment data lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeConfig {
    #[serde(default)]
    pub provider: HomeProvider,

    /// Root directory for the `local` provider; `~` is expanded
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self {
            provider: HomeProvider::Local,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HomeProvider {
    #[default]
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Program and leading arguments; the stack command is appended
    #[serde(default)]
    pub command: Vec<String>,

    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

impl EngineConfig {
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_millis(self.stop_timeout_ms)
    }
}

fn default_stop_timeout_ms() -> u64 {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevConfig {
    /// Quiet period after the last file change before a redeploy
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl DevConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_debounce_ms() -> u64 {
    200
}

/// Non-fatal configuration warning surfaced to CLI users
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub key: String,
    pub file: PathBuf,
    /// 1-indexed
    pub line: Option<usize>,
    pub suggestion: Option<String>,
}
