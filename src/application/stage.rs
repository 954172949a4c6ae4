//! Stage resolution
//!
//! Precedence: explicit flag, persisted personal stage, OS username, prompt.
//! A stage produced by the last two is written to `.stagehand/stage` so the
//! next invocation resolves to the same value without asking.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::value_objects::{current_username, validate_name, NameError};

/// Usernames too ambiguous to double as a personal stage
pub const USERNAME_DENYLIST: &[&str] = &["root", "admin", "prod", "dev", "production"];

/// Directory holding per-project local state
pub const PROJECT_STATE_DIR: &str = ".stagehand";

const STAGE_MARKER: &str = "stage";

#[derive(Debug, Error)]
pub enum StageError {
    #[error("a stage is required; pass --stage when not running in a terminal")]
    NonInteractive,

    #[error("invalid stage: {0}")]
    Invalid(#[from] NameError),

    #[error("failed to read stage from prompt: {0}")]
    Prompt(#[source] io::Error),

    #[error("failed to persist personal stage at {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Source of interactive answers
pub trait StagePrompt {
    fn is_interactive(&self) -> bool;

    fn ask(&mut self, message: &str) -> io::Result<String>;
}

/// Prompt that never has an answer; for automation and tests
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPrompt;

impl StagePrompt for NoPrompt {
    fn is_interactive(&self) -> bool {
        false
    }

    fn ask(&mut self, _message: &str) -> io::Result<String> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "no prompt"))
    }
}

/// Where a resolved stage came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageSource {
    Flag,
    Persisted,
    Username,
    Prompt,
}

pub struct StageResolver<P> {
    project_dir: PathBuf,
    username: Option<String>,
    prompt: P,
}

impl<P: StagePrompt> StageResolver<P> {
    pub fn new(project_dir: impl Into<PathBuf>, prompt: P) -> Self {
        Self {
            project_dir: project_dir.into(),
            username: current_username(),
            prompt,
        }
    }

    /// Override the username used for guessing
    pub fn with_username(mut self, username: Option<String>) -> Self {
        self.username = username;
        self
    }

    pub fn resolve(&mut self, explicit: Option<&str>) -> Result<String, StageError> {
        self.resolve_with_source(explicit).map(|(stage, _)| stage)
    }

    pub fn resolve_with_source(
        &mut self,
        explicit: Option<&str>,
    ) -> Result<(String, StageSource), StageError> {
        if let Some(stage) = explicit.map(str::trim).filter(|s| !s.is_empty()) {
            validate_name("stage", stage)?;
            return Ok((stage.to_string(), StageSource::Flag));
        }

        if let Some(stage) = load_personal_stage(&self.project_dir) {
            return Ok((stage, StageSource::Persisted));
        }

        let (stage, source) = match self.username.as_deref().and_then(guess_stage) {
            Some(stage) => (stage, StageSource::Username),
            None => (self.prompt_for_stage()?, StageSource::Prompt),
        };

        save_personal_stage(&self.project_dir, &stage).map_err(|source| StageError::Persist {
            path: marker_path(&self.project_dir),
            source,
        })?;
        tracing::info!(stage = %stage, ?source, "personal stage saved");
        Ok((stage, source))
    }

    fn prompt_for_stage(&mut self) -> Result<String, StageError> {
        if !self.prompt.is_interactive() {
            return Err(StageError::NonInteractive);
        }
        loop {
            let answer = self
                .prompt
                .ask("Enter a stage name for your personal stage")
                .map_err(StageError::Prompt)?;
            let answer = answer.trim();
            if answer.is_empty() {
                continue;
            }
            if let Err(err) = validate_name("stage", answer) {
                tracing::debug!(%err, "rejected stage from prompt");
                continue;
            }
            return Ok(answer.to_string());
        }
    }
}

/// Personal stage derived from a username.
///
/// Returns `None` for denylisted names and names that are not valid stages.
pub fn guess_stage(username: &str) -> Option<String> {
    let stage = username.trim().to_lowercase();
    if stage.is_empty() || USERNAME_DENYLIST.contains(&stage.as_str()) {
        return None;
    }
    validate_name("stage", &stage).ok()?;
    Some(stage)
}

pub fn marker_path(project_dir: &Path) -> PathBuf {
    project_dir.join(PROJECT_STATE_DIR).join(STAGE_MARKER)
}

pub fn load_personal_stage(project_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(marker_path(project_dir)).ok()?;
    let stage = content.trim();
    if stage.is_empty() || validate_name("stage", stage).is_err() {
        return None;
    }
    Some(stage.to_string())
}

pub fn save_personal_stage(project_dir: &Path, stage: &str) -> io::Result<()> {
    let path = marker_path(project_dir);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, format!("{}\n", stage))
}
