//! State machine states

use std::fmt;

use super::error::StackError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    LockHeld,
    Backend,
    Engine,
    InvalidState,
}

impl FailureKind {
    pub(crate) fn of(err: &StackError) -> Option<Self> {
        match err {
            StackError::LockHeld { .. } => Some(FailureKind::LockHeld),
            StackError::Cancelled => None,
            StackError::Backend(_) => Some(FailureKind::Backend),
            StackError::InvalidState { .. }
            | StackError::NothingPulled { .. }
            | StackError::NotLocked { .. } => Some(FailureKind::InvalidState),
            StackError::Engine(_) | StackError::EngineVanished | StackError::EngineStart(_) => {
                Some(FailureKind::Engine)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackState {
    Idle,
    Locking,
    /// Lock held, no run in progress (manual state edits, imports)
    Locked,
    Running,
    Cancelling,
    Unlocking,
    Failed(FailureKind),
}

impl StackState {
    /// States from which a new operation may begin
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            StackState::Idle | StackState::Locked | StackState::Failed(_)
        )
    }
}

impl fmt::Display for StackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackState::Idle => f.write_str("idle"),
            StackState::Locking => f.write_str("locking"),
            StackState::Locked => f.write_str("locked"),
            StackState::Running => f.write_str("running"),
            StackState::Cancelling => f.write_str("cancelling"),
            StackState::Unlocking => f.write_str("unlocking"),
            StackState::Failed(kind) => write!(f, "failed ({:?})", kind),
        }
    }
}
