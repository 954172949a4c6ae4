//! Scenario: a dev session shared by several terminals
//!
//! Journey: the first `dev` in a project becomes the server and deploys;
//! a second terminal attaches, asks for a redeploy and watches it, then
//! shuts the session down.
//!
//! Success Criteria:
//! - Only one server per project; later starts attach to it
//! - Attached clients see every frame of a run, numbered in order
//! - A stage locked by someone else is reported to attached clients
//! - Shutting down frees the project for a new server

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;
use tempfile::tempdir;

use crate::common::*;
use stagehand::application::DevSession;
use stagehand::application::RunReport;
use stagehand::domain::entities::DiagnosticLevel;
use stagehand::domain::ports::Backend;
use stagehand::infrastructure::backend::LocalBackend;
use stagehand::infrastructure::server::{self, FrameHub, ServerClient, ServerStart};
use stagehand::{CancelToken, HolderId, LifecycleEvent, Stack, StageKey};

fn key() -> StageKey {
    StageKey::new(APP, STAGE).unwrap()
}

/// SCENARIO: owner, attached client, redeploy on request, shutdown
#[test]
fn scenario_attached_client_drives_and_watches_the_session() {
    let project = tempdir().unwrap();
    let home = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));
    let engine = Arc::new(ScriptedEngine::creating(&["Bucket", "Api"]));

    let handle = match server::start(project.path(), &key()).unwrap() {
        ServerStart::Owns(handle) => handle,
        ServerStart::Attached(_) => panic!("fresh project already has a server"),
    };

    // A second start attaches to the first
    match server::start(project.path(), &key()).unwrap() {
        ServerStart::Attached(session) => assert_eq!(&session, handle.session()),
        ServerStart::Owns(_) => panic!("two servers own the same project"),
    }

    let cancel = CancelToken::new();
    let (requests, commands) = unbounded();
    let acceptor = handle.spawn_acceptor(requests.clone(), cancel.clone()).unwrap();

    let stack = Stack::new(key(), backend.clone(), engine.clone(), project.path().join("work"));
    let session = DevSession::new(stack, handle.hub().clone()).deploy_on_start(false);
    let session_cancel = cancel.clone();
    let owner = thread::spawn(move || session.run(requests, commands, &session_cancel));

    let address = handle.session().address;
    let mut frames = ServerClient::connect(address).unwrap().subscribe().unwrap();
    frames.set_read_timeout(Some(Duration::from_secs(10))).unwrap();

    let mut control = ServerClient::connect(address).unwrap();
    assert_eq!(control.status().unwrap().key, key());
    control.deploy().unwrap();

    let mut received = Vec::new();
    loop {
        let frame = frames.next_frame().unwrap().expect("session ended early");
        let terminal = frame.event.is_terminal();
        received.push(frame);
        if terminal {
            break;
        }
    }

    let seqs: Vec<u64> = received.iter().map(|f| f.seq).collect();
    assert_eq!(seqs, (0..received.len() as u64).collect::<Vec<_>>());
    assert!(received.iter().all(|f| f.key == key()));
    assert!(matches!(received[0].event, LifecycleEvent::Started { .. }));
    assert!(matches!(
        received.last().unwrap().event,
        LifecycleEvent::Completed { .. }
    ));
    assert_eq!(received.len(), 4);

    control.shutdown().unwrap();
    let reports = owner.join().unwrap();
    assert_eq!(reports.len(), 1);
    assert!(matches!(reports[0], RunReport::Completed(_)));
    assert_eq!(engine.starts(), 1);
    assert_eq!(backend.current_lock(&key()).unwrap(), None);

    cancel.cancel();
    acceptor.join().unwrap();
    drop(handle);

    assert!(server::read_session(project.path()).is_none());
    assert!(matches!(
        server::start(project.path(), &key()).unwrap(),
        ServerStart::Owns(_)
    ));
}

/// SCENARIO: the session's stage is locked by a teammate
#[test]
fn scenario_locked_stage_is_reported_to_watchers() {
    let project = tempdir().unwrap();
    let home = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));
    backend
        .acquire_lock(&key(), &HolderId::new("bob@ci"))
        .unwrap();
    let engine = Arc::new(ScriptedEngine::creating(&["Bucket"]));

    let hub = FrameHub::default();
    let frames = hub.subscribe();
    let stack = Stack::new(key(), backend.clone(), engine.clone(), project.path());
    let cancel = CancelToken::new();
    let (requests, commands) = unbounded();
    let session_cancel = cancel.clone();
    let owner = thread::spawn(move || {
        DevSession::new(stack, hub).run(requests, commands, &session_cancel)
    });

    let frame = frames.recv_timeout(Duration::from_secs(10)).unwrap();
    match frame.event {
        LifecycleEvent::Diagnostic { level, message } => {
            assert_eq!(level, DiagnosticLevel::Error);
            assert!(message.contains("locked by bob@ci"), "message: {}", message);
        }
        other => panic!("expected a diagnostic, got {:?}", other),
    }

    cancel.cancel();
    let reports = owner.join().unwrap();
    assert!(matches!(&reports[..], [RunReport::Failed(err)] if err.is_lock_held()));
    assert_eq!(engine.starts(), 0);
    assert_eq!(
        backend.current_lock(&key()).unwrap().map(|r| r.holder),
        Some(HolderId::new("bob@ci"))
    );
}
