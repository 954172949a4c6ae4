//! Stack lifecycle errors

use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;

use crate::domain::entities::LockRecord;
use crate::domain::ports::{BackendError, EngineError};
use crate::domain::value_objects::StageKey;

#[derive(Debug, Error)]
pub enum StackError {
    #[error(
        "{} is locked by {}; wait for it to finish or run `stagehand unlock`",
        .current.key,
        .current.describe(Utc::now())
    )]
    LockHeld { current: Box<LockRecord> },

    #[error("{operation} on {key} requires holding the lock")]
    NotLocked {
        key: StageKey,
        operation: &'static str,
    },

    #[error("no state has been pulled for {key}")]
    NothingPulled { key: StageKey },

    #[error("state file {} is not valid: {reason}", .path.display())]
    InvalidState { path: PathBuf, reason: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("engine reported an error: {0}")]
    Engine(String),

    #[error("engine exited without reporting a result")]
    EngineVanished,

    #[error(transparent)]
    EngineStart(#[from] EngineError),

    #[error(transparent)]
    Backend(BackendError),
}

impl From<BackendError> for StackError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::AlreadyLocked { current } => StackError::LockHeld { current },
            BackendError::InvalidState { path, reason } => StackError::InvalidState { path, reason },
            other => StackError::Backend(other),
        }
    }
}

impl StackError {
    pub fn is_lock_held(&self) -> bool {
        matches!(self, StackError::LockHeld { .. })
    }
}
