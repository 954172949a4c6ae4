//! Stack lifecycle: lock, run, unlock, cancel, import, pull and push.
//!
//! Mutual exclusion comes from the backend lock, never from an in-process
//! mutex. Every operation that takes the lock gives it back on success,
//! error and cancellation alike.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::RecvTimeoutError;
use tracing::{debug, info, warn};

use crate::application::cancel::CancelToken;
use crate::application::events::EventPublisher;
use crate::domain::entities::{
    validate_state_blob, ImportSpec, LifecycleEvent, LockRecord, RunOutcome, StackCommand,
};
use crate::domain::ports::{
    Backend, BackendError, EngineMessage, EngineRequest, EngineRun, ProvisioningEngine,
};
use crate::domain::value_objects::{HolderId, StageKey};

use super::error::StackError;
use super::state::{FailureKind, StackState};

/// How often a run checks for cancellation while waiting on the engine
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default time an engine gets to acknowledge a stop request
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Stack {
    key: StageKey,
    holder: HolderId,
    backend: Arc<dyn Backend>,
    engine: Arc<dyn ProvisioningEngine>,
    work_dir: PathBuf,
    stop_timeout: Duration,
    state: StackState,
    lock: Option<LockRecord>,
    pulled: Option<PathBuf>,
}

impl Stack {
    pub fn new(
        key: StageKey,
        backend: Arc<dyn Backend>,
        engine: Arc<dyn ProvisioningEngine>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            key,
            holder: HolderId::current(),
            backend,
            engine,
            work_dir: work_dir.into(),
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            state: StackState::Idle,
            lock: None,
            pulled: None,
        }
    }

    pub fn with_holder(mut self, holder: HolderId) -> Self {
        self.holder = holder;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn key(&self) -> &StageKey {
        &self.key
    }

    pub fn holder(&self) -> &HolderId {
        &self.holder
    }

    pub fn state(&self) -> StackState {
        self.state
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Acquire the stage lock, failing fast if someone else holds it.
    ///
    /// Re-entrant: a stack that already holds the lock gets its record back.
    pub fn lock(&mut self) -> Result<&LockRecord, StackError> {
        if self.lock.is_none() {
            self.state = StackState::Locking;
            match self.backend.acquire_lock(&self.key, &self.holder) {
                Ok(record) => {
                    info!(key = %self.key, holder = %self.holder, "lock acquired");
                    self.lock = Some(record);
                    self.state = StackState::Locked;
                }
                Err(err) => {
                    let err = StackError::from(err);
                    if let StackError::LockHeld { current } = &err {
                        info!(key = %self.key, holder = %current.holder, "lock held elsewhere");
                    }
                    self.fail(&err);
                    return Err(err);
                }
            }
        }
        self.lock.as_ref().ok_or(StackError::NotLocked {
            key: self.key.clone(),
            operation: "lock",
        })
    }

    /// Release the stage lock if this stack holds it.
    ///
    /// A lock that was force-cleared by someone else is treated as released.
    pub fn unlock(&mut self) -> Result<(), StackError> {
        let Some(record) = self.lock.take() else {
            return Ok(());
        };
        self.state = StackState::Unlocking;
        self.pulled = None;

        match self.backend.release_lock(&self.key, &self.holder) {
            Ok(()) => {
                info!(key = %self.key, "lock released");
                self.state = StackState::Idle;
                Ok(())
            }
            Err(BackendError::NotHolder { current, .. }) => {
                warn!(
                    key = %self.key,
                    current = ?current,
                    "lock was cleared by someone else before release"
                );
                self.state = StackState::Idle;
                Ok(())
            }
            Err(err) => {
                self.lock = Some(record);
                let err = StackError::from(err);
                self.fail(&err);
                Err(err)
            }
        }
    }

    /// Run `command` through the engine, relaying its events to `events`.
    ///
    /// Takes the lock if it is not already held and always releases it before
    /// returning. Exactly one terminal event is published once `Started` was.
    pub fn run(
        &mut self,
        command: StackCommand,
        mut events: EventPublisher,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, StackError> {
        self.lock()?;
        self.state = StackState::Running;
        info!(key = %self.key, %command, "run started");
        events.emit(LifecycleEvent::Started { command });

        let result = self.drive(command, &mut events, cancel);

        match &result {
            Ok(outcome) => {
                events.emit(LifecycleEvent::Completed {
                    outcome: outcome.clone(),
                });
            }
            Err(err) => {
                events.emit(LifecycleEvent::Failed {
                    error: err.to_string(),
                });
            }
        }

        let unlocked = self.unlock();
        match (result, unlocked) {
            (Ok(outcome), Ok(())) => {
                info!(key = %self.key, %command, "run completed");
                Ok(outcome)
            }
            (Ok(_), Err(unlock_err)) => Err(unlock_err),
            (Err(err), unlocked) => {
                if let Err(unlock_err) = unlocked {
                    warn!(key = %self.key, error = %unlock_err, "unlock failed after run error");
                }
                info!(key = %self.key, %command, error = %err, "run ended with error");
                self.fail(&err);
                Err(err)
            }
        }
    }

    fn drive(
        &mut self,
        command: StackCommand,
        events: &mut EventPublisher,
        cancel: &CancelToken,
    ) -> Result<RunOutcome, StackError> {
        let request = EngineRequest {
            key: self.key.clone(),
            command,
        };
        let EngineRun {
            messages,
            mut control,
        } = self.engine.start(&request)?;

        let mut stop_deadline: Option<Instant> = None;
        loop {
            if stop_deadline.is_none() && cancel.is_cancelled() {
                info!(key = %self.key, "cancelling run");
                self.state = StackState::Cancelling;
                if let Err(err) = control.stop() {
                    warn!(error = %err, "engine stop request failed");
                }
                stop_deadline = Some(Instant::now() + self.stop_timeout);
            }

            match messages.recv_timeout(POLL_INTERVAL) {
                Ok(EngineMessage::Progress { resource, status }) => {
                    events.emit(LifecycleEvent::Progress { resource, status });
                }
                Ok(EngineMessage::Diagnostic { level, message }) => {
                    events.emit(LifecycleEvent::Diagnostic { level, message });
                }
                Ok(EngineMessage::Finished { summary }) => {
                    return Ok(RunOutcome { command, summary });
                }
                Ok(EngineMessage::Error { message }) => {
                    if stop_deadline.is_some() {
                        return Err(StackError::Cancelled);
                    }
                    return Err(StackError::Engine(message));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(deadline) = stop_deadline {
                        if Instant::now() >= deadline {
                            warn!(key = %self.key, "engine did not acknowledge stop in time");
                            return Err(StackError::Cancelled);
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    if stop_deadline.is_some() {
                        return Err(StackError::Cancelled);
                    }
                    return Err(StackError::EngineVanished);
                }
            }
        }
    }

    /// Force-clear the stage lock regardless of who holds it.
    ///
    /// Operator recovery only: a remote operation that is really running is
    /// not stopped, it just loses its exclusivity.
    pub fn cancel(&mut self) -> Result<Option<LockRecord>, StackError> {
        let cleared = self.backend.force_unlock(&self.key)?;
        match &cleared {
            Some(record) => info!(key = %self.key, holder = %record.holder, "lock force-cleared"),
            None => info!(key = %self.key, "no lock to clear"),
        }
        self.lock = None;
        self.pulled = None;
        self.state = StackState::Idle;
        Ok(cleared)
    }

    /// Adopt an existing resource into tracked state
    pub fn import(&mut self, spec: &ImportSpec) -> Result<(), StackError> {
        self.with_lock(|stack| {
            info!(
                key = %stack.key,
                resource_type = %spec.resource_type,
                name = %spec.name,
                "importing resource"
            );
            stack
                .backend
                .import_resource(&stack.key, spec)
                .map_err(StackError::from)
        })
    }

    /// Materialize the state blob locally for editing. Requires the lock.
    pub fn pull_state(&mut self) -> Result<PathBuf, StackError> {
        self.require_lock("pull state")?;
        let path = self.backend.pull_state(&self.key, &self.work_dir)?;
        debug!(key = %self.key, path = %path.display(), "state pulled");
        self.pulled = Some(path.clone());
        Ok(path)
    }

    /// Path of the most recent pull, if any
    pub fn pulled_path(&self) -> Option<&Path> {
        self.pulled.as_deref()
    }

    /// Validate and upload the pulled state. Requires the lock.
    pub fn push_state(&mut self) -> Result<(), StackError> {
        self.require_lock("push state")?;
        let path = self.pulled.clone().ok_or_else(|| StackError::NothingPulled {
            key: self.key.clone(),
        })?;
        let bytes = fs::read(&path).map_err(|e| StackError::InvalidState {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        validate_state_blob(&bytes).map_err(|reason| StackError::InvalidState {
            path: path.clone(),
            reason,
        })?;
        self.backend.push_state(&self.key, &path)?;
        info!(key = %self.key, bytes = bytes.len(), "state pushed");
        Ok(())
    }

    /// Hold the lock for the duration of `f`, releasing it on every exit path
    pub fn with_lock<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E>
    where
        E: From<StackError>,
    {
        self.lock().map_err(E::from)?;
        let result = f(self);
        let unlocked = self.unlock();
        match (result, unlocked) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(E::from(err)),
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(unlock_err)) => {
                warn!(key = %self.key, error = %unlock_err, "unlock failed after error");
                Err(err)
            }
        }
    }

    fn require_lock(&self, operation: &'static str) -> Result<(), StackError> {
        if self.lock.is_none() {
            return Err(StackError::NotLocked {
                key: self.key.clone(),
                operation,
            });
        }
        Ok(())
    }

    fn fail(&mut self, err: &StackError) {
        self.state = match FailureKind::of(err) {
            Some(kind) => StackState::Failed(kind),
            None if self.lock.is_some() => StackState::Locked,
            None => StackState::Idle,
        };
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        if self.lock.is_some() {
            warn!(key = %self.key, "stack dropped while holding the lock; releasing");
            if let Err(err) = self.unlock() {
                warn!(key = %self.key, error = %err, "lock release on drop failed");
            }
        }
    }
}
