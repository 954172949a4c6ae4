//! Backend port - the home provider holding shared deployment data
//!
//! Secrets, linked-resource descriptors, the state blob and lock records all
//! live behind this trait. Implementations guarantee the atomicity of each
//! call; callers are responsible for using the lock correctly.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::entities::{ImportSpec, LockRecord};
use crate::domain::value_objects::{HolderId, StageKey};

pub type BackendResult<T> = Result<T, BackendError>;

pub type SecretMap = BTreeMap<String, String>;
pub type LinkMap = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{} is locked by {}", .current.key, .current.holder)]
    AlreadyLocked { current: Box<LockRecord> },

    #[error("{key} is not locked by {holder}")]
    NotHolder {
        key: StageKey,
        holder: HolderId,
        current: Option<HolderId>,
    },

    #[error("state file {} is not valid: {reason}", .path.display())]
    InvalidState { path: PathBuf, reason: String },

    #[error("{} is corrupted: {message}", .path.display())]
    Corrupted { path: PathBuf, message: String },

    #[error("backend {op} failed: {source}")]
    Io {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl BackendError {
    pub fn io(op: &'static str) -> impl FnOnce(io::Error) -> BackendError {
        move |source| BackendError::Io { op, source }
    }

    /// Transient failures are surfaced to the operator, never retried
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Io { .. })
    }
}

pub trait Backend: Send + Sync {
    fn get_secrets(&self, key: &StageKey) -> BackendResult<SecretMap>;

    fn put_secrets(&self, key: &StageKey, secrets: &SecretMap) -> BackendResult<()>;

    /// Read-modify-write of the secret map as one atomic section.
    ///
    /// `update` returns whether it changed the map; nothing is written when it
    /// did not. The return value is whatever `update` reported.
    fn update_secrets(
        &self,
        key: &StageKey,
        update: &mut dyn FnMut(&mut SecretMap) -> bool,
    ) -> BackendResult<bool>;

    fn get_links(&self, key: &StageKey) -> BackendResult<LinkMap>;

    /// Atomic compare-and-create of the lock record
    fn acquire_lock(&self, key: &StageKey, holder: &HolderId) -> BackendResult<LockRecord>;

    /// Remove the lock record if `holder` owns it
    fn release_lock(&self, key: &StageKey, holder: &HolderId) -> BackendResult<()>;

    /// Remove the lock record whoever owns it. Returns the cleared record.
    fn force_unlock(&self, key: &StageKey) -> BackendResult<Option<LockRecord>>;

    fn current_lock(&self, key: &StageKey) -> BackendResult<Option<LockRecord>>;

    /// Materialize the state blob under `dir`, returning the file path
    fn pull_state(&self, key: &StageKey, dir: &Path) -> BackendResult<PathBuf>;

    fn push_state(&self, key: &StageKey, path: &Path) -> BackendResult<()>;

    fn import_resource(&self, key: &StageKey, spec: &ImportSpec) -> BackendResult<()>;
}
