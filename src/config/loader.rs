//! Configuration discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::{Config, ConfigWarning};
use crate::infrastructure::fs::{default_backend_root, expand_home};

/// Project configuration file name
pub const CONFIG_FILE: &str = "stagehand.toml";

pub const HOME_ENV: &str = "STAGEHAND_HOME";
pub const ENGINE_ENV: &str = "STAGEHAND_ENGINE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {} found in {} or any parent directory", CONFIG_FILE, .start.display())]
    NotFound { start: PathBuf },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid config {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },

    #[error("cannot determine a home directory; set {}", HOME_ENV)]
    NoHome,
}

/// A loaded `stagehand.toml` and the project it belongs to
#[derive(Debug, Clone)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub path: PathBuf,
    pub config: Config,
    pub warnings: Vec<ConfigWarning>,
}

impl ProjectConfig {
    /// Walk up from `start` to the nearest `stagehand.toml` and load it
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        let path = find_config(start).ok_or_else(|| ConfigError::NotFound {
            start: start.to_path_buf(),
        })?;
        Self::load(&path)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let (config, warnings) = load_with_warnings(path)?;
        let config = with_env_overrides(config);
        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let project = Self {
            root,
            path: path.to_path_buf(),
            config,
            warnings,
        };
        project.app_name()?;
        Ok(project)
    }

    /// `[app] name`, or the project directory name
    pub fn app_name(&self) -> Result<String, ConfigError> {
        let name = match &self.config.app.name {
            Some(name) => name.clone(),
            None => self
                .root
                .canonicalize()
                .unwrap_or_else(|_| self.root.clone())
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        };
        crate::domain::value_objects::validate_name("app", &name).map_err(|e| {
            ConfigError::Invalid {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(name)
    }

    /// Root directory of the local home provider
    pub fn home_root(&self) -> Result<PathBuf, ConfigError> {
        match &self.config.home.path {
            Some(path) => {
                let path = expand_home(path);
                if path.is_relative() {
                    Ok(self.root.join(path))
                } else {
                    Ok(path)
                }
            }
            None => default_backend_root().ok_or(ConfigError::NoHome),
        }
    }
}

/// Nearest `stagehand.toml` at or above `start`
pub fn find_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE))
        .find(|candidate| candidate.is_file())
}

/// Parse a config file, collecting unknown keys as warnings
pub fn load_with_warnings(path: &Path) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_with_warnings(&content, path)
}

pub(crate) fn parse_with_warnings(
    content: &str,
    path: &Path,
) -> Result<(Config, Vec<ConfigWarning>), ConfigError> {
    let mut unknown_paths: Vec<String> = Vec::new();
    let deserializer = toml::de::Deserializer::new(content);

    let config: Config = serde_ignored::deserialize(deserializer, |p| {
        unknown_paths.push(p.to_string());
    })
    .map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let warnings = unknown_paths
        .into_iter()
        .map(|path_str| {
            let key = path_str
                .split('.')
                .next_back()
                .unwrap_or(path_str.as_str())
                .to_string();
            ConfigWarning {
                line: find_line_number(content, &key),
                suggestion: suggest_key(&key),
                key,
                file: path.to_path_buf(),
            }
        })
        .collect();

    Ok((config, warnings))
}

/// Apply `STAGEHAND_*` environment overrides
pub fn with_env_overrides(config: Config) -> Config {
    apply_overrides(config, |name| std::env::var(name).ok())
}

pub(crate) fn apply_overrides(
    mut config: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Config {
    if let Some(home) = lookup(HOME_ENV).filter(|v| !v.trim().is_empty()) {
        config.home.path = Some(PathBuf::from(home));
    }

    if let Some(engine) = lookup(ENGINE_ENV) {
        let command: Vec<String> = engine.split_whitespace().map(str::to_string).collect();
        if !command.is_empty() {
            config.engine.command = command;
        }
    }

    config
}

fn find_line_number(content: &str, needle: &str) -> Option<usize> {
    content
        .lines()
        .position(|line| line.contains(needle))
        .map(|i| i + 1)
}

fn suggest_key(unknown: &str) -> Option<String> {
    const CANDIDATES: &[&str] = &[
        "app",
        "name",
        "home",
        "provider",
        "path",
        "engine",
        "command",
        "stop_timeout_ms",
        "dev",
        "debounce_ms",
    ];

    let mut best: Option<(&str, usize)> = None;
    for candidate in CANDIDATES {
        let dist = levenshtein(unknown, candidate);
        best = match best {
            None => Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => Some((candidate, dist)),
            Some(current) => Some(current),
        };
    }

    match best {
        Some((candidate, dist)) if dist <= 2 => Some(candidate.to_string()),
        _ => None,
    }
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }

    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    let mut prev: Vec<usize> = (0..=b_bytes.len()).collect();
    let mut curr = vec![0usize; b_bytes.len() + 1];

    for (i, &ac) in a_bytes.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &bc) in b_bytes.iter().enumerate() {
            let cost = if ac == bc { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_bytes.len()]
}
