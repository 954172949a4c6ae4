//! Error taxonomy
//!
//! Each component owns a `thiserror` enum. `StagehandError` gathers them for
//! code that crosses components, and `ErrorKind` is what the CLI uses to
//! decide how much of an error to show.

use thiserror::Error;

use crate::application::secrets::SecretError;
use crate::application::stack::StackError;
use crate::application::stage::StageError;
use crate::application::state_edit::EditError;
use crate::commands::CommandError;
use crate::config::ConfigError;
use crate::domain::ports::{BackendError, EngineError};
use crate::domain::value_objects::NameError;
use crate::infrastructure::server::ServerError;
use crate::presentation::registry::RegistryError;

pub type StagehandResult<T> = Result<T, StagehandError>;

#[derive(Debug, Error)]
pub enum StagehandError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Name(#[from] NameError),

    #[error(transparent)]
    Stage(#[from] StageError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Stack(#[from] StackError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LockHeld,
    SecretNotFound,
    ServerAlreadyRunning,
    Config,
    NonInteractive,
    InvalidInput,
    InvalidState,
    Engine,
    /// A command the user asked us to run failed
    ChildProcess,
    Cancelled,
    /// Backend or network I/O; surfaced, never retried
    Transient,
    Unexpected,
}

impl ErrorKind {
    /// Errors the operator can act on from the message alone
    pub fn is_user_actionable(&self) -> bool {
        !matches!(self, ErrorKind::Unexpected)
    }
}

impl StagehandError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StagehandError::Registry(_) => ErrorKind::Unexpected,
            StagehandError::Name(_) => ErrorKind::InvalidInput,
            StagehandError::Stage(e) => stage_kind(e),
            StagehandError::Backend(e) => backend_kind(e),
            StagehandError::Engine(e) => engine_kind(e),
            StagehandError::Stack(e) => stack_kind(e),
            StagehandError::Server(e) => server_kind(e),
            StagehandError::Config(_) => ErrorKind::Config,
            StagehandError::Secret(e) => secret_kind(e),
            StagehandError::Edit(e) => edit_kind(e),
        }
    }
}

/// Classify a handler error by the first component error in its chain
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    err.chain()
        .find_map(kind_of)
        .unwrap_or(ErrorKind::Unexpected)
}

/// Message of the component error that decided the kind, without the chain
pub fn user_message(err: &anyhow::Error) -> String {
    err.chain()
        .find(|cause| kind_of(*cause).is_some())
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

fn kind_of(cause: &(dyn std::error::Error + 'static)) -> Option<ErrorKind> {
    if let Some(e) = cause.downcast_ref::<StagehandError>() {
        return Some(e.kind());
    }
    if let Some(e) = cause.downcast_ref::<StackError>() {
        return Some(stack_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<BackendError>() {
        return Some(backend_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<SecretError>() {
        return Some(secret_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<ServerError>() {
        return Some(server_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<StageError>() {
        return Some(stage_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<EditError>() {
        return Some(edit_kind(e));
    }
    if let Some(e) = cause.downcast_ref::<EngineError>() {
        return Some(engine_kind(e));
    }
    if cause.is::<CommandError>() {
        return Some(ErrorKind::ChildProcess);
    }
    if cause.is::<ConfigError>() {
        return Some(ErrorKind::Config);
    }
    if cause.is::<NameError>() {
        return Some(ErrorKind::InvalidInput);
    }
    None
}

fn stack_kind(err: &StackError) -> ErrorKind {
    match err {
        StackError::LockHeld { .. } => ErrorKind::LockHeld,
        StackError::Cancelled => ErrorKind::Cancelled,
        StackError::InvalidState { .. } | StackError::NothingPulled { .. } => {
            ErrorKind::InvalidState
        }
        StackError::Engine(_) | StackError::EngineVanished => ErrorKind::Engine,
        StackError::EngineStart(e) => engine_kind(e),
        StackError::Backend(e) => backend_kind(e),
        StackError::NotLocked { .. } => ErrorKind::Unexpected,
    }
}

fn backend_kind(err: &BackendError) -> ErrorKind {
    match err {
        BackendError::AlreadyLocked { .. } => ErrorKind::LockHeld,
        BackendError::InvalidState { .. } => ErrorKind::InvalidState,
        BackendError::Io { .. } => ErrorKind::Transient,
        BackendError::NotHolder { .. } | BackendError::Corrupted { .. } => ErrorKind::Unexpected,
    }
}

fn engine_kind(err: &EngineError) -> ErrorKind {
    match err {
        EngineError::NotConfigured => ErrorKind::Config,
        EngineError::Spawn { .. } => ErrorKind::Engine,
        EngineError::Stop(_) => ErrorKind::Unexpected,
    }
}

fn server_kind(err: &ServerError) -> ErrorKind {
    match err {
        ServerError::AlreadyRunning { .. } => ErrorKind::ServerAlreadyRunning,
        ServerError::Io { .. } | ServerError::SessionUnavailable { .. } => ErrorKind::Transient,
        ServerError::Protocol(_) => ErrorKind::Unexpected,
    }
}

fn stage_kind(err: &StageError) -> ErrorKind {
    match err {
        StageError::NonInteractive => ErrorKind::NonInteractive,
        StageError::Invalid(_) => ErrorKind::InvalidInput,
        StageError::Prompt(_) | StageError::Persist { .. } => ErrorKind::Unexpected,
    }
}

fn secret_kind(err: &SecretError) -> ErrorKind {
    match err {
        SecretError::NotFound { .. } => ErrorKind::SecretNotFound,
        SecretError::EmptyName => ErrorKind::InvalidInput,
        SecretError::Backend(e) => backend_kind(e),
    }
}

fn edit_kind(err: &EditError) -> ErrorKind {
    match err {
        EditError::Stack(e) => stack_kind(e),
        EditError::Editor(_) => ErrorKind::Config,
        EditError::Read { .. } => ErrorKind::Unexpected,
    }
}
