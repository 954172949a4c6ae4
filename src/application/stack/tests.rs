use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{unbounded, Sender};
use tempfile::{tempdir, TempDir};

use super::*;
use crate::application::cancel::CancelToken;
use crate::application::events::event_channel;
use crate::domain::entities::{ChangeSummary, ImportSpec, LifecycleEvent, StackCommand};
use crate::domain::ports::{
    Backend, EngineControl, EngineError, EngineMessage, EngineRequest, EngineRun,
    ProvisioningEngine,
};
use crate::domain::value_objects::{HolderId, StageKey};
use crate::infrastructure::backend::LocalBackend;

#[derive(Clone, Copy)]
enum OnStop {
    /// Report an error once asked to stop
    Acknowledge,
    /// Keep the channel open and never answer
    Ignore,
}

/// Engine replaying a fixed script; optionally stays running until stopped
struct ScriptedEngine {
    script: Vec<EngineMessage>,
    hang: Option<OnStop>,
    requests: Mutex<Vec<EngineRequest>>,
}

impl ScriptedEngine {
    fn finishing(script: Vec<EngineMessage>) -> Self {
        Self {
            script,
            hang: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn hanging(on_stop: OnStop) -> Self {
        Self {
            script: vec![progress("Api")],
            hang: Some(on_stop),
            requests: Mutex::new(Vec::new()),
        }
    }
}

struct ScriptedControl {
    tx: Option<Sender<EngineMessage>>,
    on_stop: OnStop,
}

impl EngineControl for ScriptedControl {
    fn stop(&mut self) -> Result<(), EngineError> {
        if let OnStop::Acknowledge = self.on_stop {
            if let Some(tx) = self.tx.take() {
                let _ = tx.send(EngineMessage::Error {
                    message: "interrupted".to_string(),
                });
            }
        }
        Ok(())
    }
}

impl ProvisioningEngine for ScriptedEngine {
    fn start(&self, request: &EngineRequest) -> Result<EngineRun, EngineError> {
        self.requests.lock().unwrap().push(request.clone());
        let (tx, rx) = unbounded();
        for message in &self.script {
            tx.send(message.clone()).unwrap();
        }
        let (tx, on_stop) = match self.hang {
            Some(on_stop) => (Some(tx), on_stop),
            None => (None, OnStop::Acknowledge),
        };
        Ok(EngineRun {
            messages: rx,
            control: Box::new(ScriptedControl { tx, on_stop }),
        })
    }
}

fn progress(resource: &str) -> EngineMessage {
    EngineMessage::Progress {
        resource: resource.to_string(),
        status: "updating".to_string(),
    }
}

fn finished(created: usize) -> EngineMessage {
    EngineMessage::Finished {
        summary: ChangeSummary {
            created,
            ..ChangeSummary::default()
        },
    }
}

struct Fixture {
    _home: TempDir,
    work: TempDir,
    backend: Arc<LocalBackend>,
}

impl Fixture {
    fn new() -> Self {
        let home = tempdir().unwrap();
        let backend = Arc::new(LocalBackend::new(home.path()));
        Self {
            _home: home,
            work: tempdir().unwrap(),
            backend,
        }
    }

    fn stack(&self, engine: ScriptedEngine) -> Stack {
        Stack::new(key(), self.backend.clone(), Arc::new(engine), self.work.path())
    }

    fn lock_holder(&self) -> Option<HolderId> {
        self.backend
            .current_lock(&key())
            .unwrap()
            .map(|record| record.holder)
    }
}

fn key() -> StageKey {
    StageKey::new("shop", "alice").unwrap()
}

#[test]
fn successful_run_relays_events_in_order_and_releases_lock() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![
        progress("Bucket"),
        progress("Api"),
        finished(2),
    ]));
    let (publisher, hub) = event_channel(16);
    let sub = hub.subscribe();

    let outcome = stack
        .run(StackCommand::Up, publisher, &CancelToken::new())
        .unwrap();

    assert_eq!(outcome.summary.created, 2);
    assert_eq!(stack.state(), StackState::Idle);
    assert!(fx.lock_holder().is_none());

    let events = sub.collect_all();
    assert_eq!(
        events.first(),
        Some(&LifecycleEvent::Started {
            command: StackCommand::Up
        })
    );
    let resources: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            LifecycleEvent::Progress { resource, .. } => Some(resource.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(resources, vec!["Bucket", "Api"]);
    assert!(matches!(
        events.last(),
        Some(LifecycleEvent::Completed { .. })
    ));
}

#[test]
fn engine_receives_key_and_command() {
    let fx = Fixture::new();
    let engine = Arc::new(ScriptedEngine::finishing(vec![finished(0)]));
    let mut stack = Stack::new(key(), fx.backend.clone(), engine.clone(), fx.work.path());
    let (publisher, _hub) = event_channel(4);
    stack
        .run(StackCommand::Destroy, publisher, &CancelToken::new())
        .unwrap();

    let requests = engine.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].key, key());
    assert_eq!(requests[0].command, StackCommand::Destroy);
}

#[test]
fn held_lock_fails_fast_without_events() {
    let fx = Fixture::new();
    let other = HolderId::new("bob@ci:7/00000000");
    fx.backend.acquire_lock(&key(), &other).unwrap();

    let mut stack = fx.stack(ScriptedEngine::finishing(vec![finished(0)]));
    let (publisher, hub) = event_channel(4);
    let sub = hub.subscribe();

    let err = stack
        .run(StackCommand::Up, publisher, &CancelToken::new())
        .unwrap_err();

    match &err {
        StackError::LockHeld { current } => assert_eq!(current.holder, other),
        other => panic!("expected LockHeld, got {:?}", other),
    }
    assert!(err.to_string().contains("bob@ci:7/00000000"));
    assert_eq!(stack.state(), StackState::Failed(FailureKind::LockHeld));
    assert!(sub.collect_all().is_empty());
    // The other holder keeps its lock
    assert_eq!(fx.lock_holder(), Some(other));
}

#[test]
fn engine_error_emits_failed_and_releases_lock() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![
        progress("Bucket"),
        EngineMessage::Error {
            message: "quota exceeded".to_string(),
        },
    ]));
    let (publisher, hub) = event_channel(16);
    let sub = hub.subscribe();

    let err = stack
        .run(StackCommand::Up, publisher, &CancelToken::new())
        .unwrap_err();

    assert!(matches!(&err, StackError::Engine(m) if m == "quota exceeded"));
    assert_eq!(stack.state(), StackState::Failed(FailureKind::Engine));
    assert!(fx.lock_holder().is_none());
    let events = sub.collect_all();
    assert!(matches!(
        events.last(),
        Some(LifecycleEvent::Failed { error }) if error.contains("quota exceeded")
    ));
}

#[test]
fn vanished_engine_is_an_error() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![progress("Bucket")]));
    let (publisher, _hub) = event_channel(4);
    let err = stack
        .run(StackCommand::Refresh, publisher, &CancelToken::new())
        .unwrap_err();
    assert!(matches!(err, StackError::EngineVanished));
    assert!(fx.lock_holder().is_none());
}

#[test]
fn cancellation_stops_engine_and_releases_lock() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::hanging(OnStop::Acknowledge));
    let (publisher, hub) = event_channel(16);
    let sub = hub.subscribe();
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = stack.run(StackCommand::Up, publisher, &cancel).unwrap_err();

    assert!(matches!(err, StackError::Cancelled));
    assert_eq!(stack.state(), StackState::Idle);
    assert!(fx.lock_holder().is_none());
    assert!(matches!(
        sub.collect_all().last(),
        Some(LifecycleEvent::Failed { error }) if error == "operation cancelled"
    ));
}

#[test]
fn unresponsive_engine_is_abandoned_after_stop_timeout() {
    let fx = Fixture::new();
    let mut stack = fx
        .stack(ScriptedEngine::hanging(OnStop::Ignore))
        .with_stop_timeout(Duration::from_millis(100));
    let (publisher, _hub) = event_channel(16);
    let cancel = CancelToken::new();
    cancel.cancel();

    let err = stack.run(StackCommand::Up, publisher, &cancel).unwrap_err();
    assert!(matches!(err, StackError::Cancelled));
    assert!(fx.lock_holder().is_none());
}

#[test]
fn pull_then_push_preserves_bytes() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    stack.lock().unwrap();

    let path = stack.pull_state().unwrap();
    let edited = "{\n  \"resources\": [{\"type\": \"bucket\", \"name\": \"Assets\"}]\n}\n";
    fs::write(&path, edited).unwrap();
    stack.push_state().unwrap();
    stack.unlock().unwrap();

    stack.lock().unwrap();
    let again = stack.pull_state().unwrap();
    assert_eq!(fs::read_to_string(again).unwrap(), edited);
    stack.unlock().unwrap();
    assert!(fx.lock_holder().is_none());
}

#[test]
fn state_operations_require_the_lock() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    assert!(matches!(
        stack.pull_state(),
        Err(StackError::NotLocked { .. })
    ));
    assert!(matches!(
        stack.push_state(),
        Err(StackError::NotLocked { .. })
    ));

    stack.lock().unwrap();
    assert!(matches!(
        stack.push_state(),
        Err(StackError::NothingPulled { .. })
    ));
}

#[test]
fn invalid_push_keeps_lock_and_remote_state() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    stack.lock().unwrap();
    let path = stack.pull_state().unwrap();
    let original = fs::read_to_string(&path).unwrap();

    fs::write(&path, "   ").unwrap();
    let err = stack.push_state().unwrap_err();
    assert!(matches!(err, StackError::InvalidState { .. }));
    assert!(stack.is_locked());

    let again = stack.pull_state().unwrap();
    assert_eq!(fs::read_to_string(again).unwrap(), original);
}

#[test]
fn with_lock_releases_on_error() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));

    let result: Result<(), StackError> = stack.with_lock(|s| {
        assert!(s.is_locked());
        Err(StackError::Engine("editor crashed".to_string()))
    });

    assert!(result.is_err());
    assert!(!stack.is_locked());
    assert!(fx.lock_holder().is_none());
}

#[test]
fn import_releases_lock_on_success_and_failure() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    let spec = ImportSpec::new("aws:s3:Bucket", "Assets", "assets-1");

    stack.import(&spec).unwrap();
    assert!(fx.lock_holder().is_none());

    let err = stack.import(&spec).unwrap_err();
    assert!(matches!(err, StackError::InvalidState { .. }));
    assert!(fx.lock_holder().is_none());
}

#[test]
fn cancel_clears_a_lock_held_by_anyone() {
    let fx = Fixture::new();
    fx.backend
        .acquire_lock(&key(), &HolderId::new("crashed-ci"))
        .unwrap();

    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    let cleared = stack.cancel().unwrap();
    assert_eq!(cleared.unwrap().holder, HolderId::new("crashed-ci"));
    assert!(fx.lock_holder().is_none());
    assert_eq!(stack.state(), StackState::Idle);

    // Nothing left to clear
    assert!(stack.cancel().unwrap().is_none());
}

#[test]
fn unlock_after_force_clear_is_not_an_error() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    stack.lock().unwrap();
    fx.backend.force_unlock(&key()).unwrap();

    stack.unlock().unwrap();
    assert_eq!(stack.state(), StackState::Idle);
}

#[test]
fn dropping_a_locked_stack_releases_the_lock() {
    let fx = Fixture::new();
    {
        let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
        stack.lock().unwrap();
        assert!(fx.lock_holder().is_some());
    }
    assert!(fx.lock_holder().is_none());
}

#[test]
fn lock_is_reentrant_for_the_same_stack() {
    let fx = Fixture::new();
    let mut stack = fx.stack(ScriptedEngine::finishing(vec![]));
    let first = stack.lock().unwrap().clone();
    let second = stack.lock().unwrap().clone();
    assert_eq!(first, second);
    assert_eq!(stack.state(), StackState::Locked);
}
