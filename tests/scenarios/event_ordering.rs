//! Scenario: two stages deploy at the same time
//!
//! Journey: alice and bob deploy their personal stages concurrently while a
//! renderer and a log collector watch each run.
//!
//! Success Criteria:
//! - Every observer sees its run's events in engine order
//! - Started comes first and exactly one terminal event comes last
//! - Nothing from one stage shows up in the other's stream

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tempfile::tempdir;

use crate::common::*;
use stagehand::application::events::{event_channel, DEFAULT_CAPACITY};
use stagehand::domain::entities::{ChangeSummary, RunOutcome};
use stagehand::infrastructure::backend::LocalBackend;
use stagehand::{CancelToken, LifecycleEvent, Stack, StackCommand, StageKey};

fn expected(resources: &[&str]) -> Vec<LifecycleEvent> {
    let mut events = vec![LifecycleEvent::Started {
        command: StackCommand::Up,
    }];
    events.extend(resources.iter().map(|r| LifecycleEvent::Progress {
        resource: r.to_string(),
        status: "creating".to_string(),
    }));
    events.push(LifecycleEvent::Completed {
        outcome: RunOutcome {
            command: StackCommand::Up,
            summary: ChangeSummary {
                created: resources.len(),
                ..ChangeSummary::default()
            },
        },
    });
    events
}

/// SCENARIO: concurrent runs on different keys do not interleave
#[test]
fn scenario_runs_on_different_stages_keep_their_own_order() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));

    let runs = [
        ("alice", vec!["alice-bucket", "alice-queue", "alice-api", "alice-cdn"]),
        ("bob", vec!["bob-bucket", "bob-queue", "bob-api", "bob-cdn"]),
    ];

    let handles: Vec<_> = runs
        .iter()
        .map(|(stage, resources)| {
            let key = StageKey::new(APP, *stage).unwrap();
            let engine = ScriptedEngine::creating(resources).with_delay(Duration::from_millis(5));
            let mut stack = Stack::new(key, backend.clone(), Arc::new(engine), work.path());

            let (publisher, events) = event_channel(DEFAULT_CAPACITY);
            let renderer = events.subscribe();
            let collector = events.subscribe();
            let runner = thread::spawn(move || {
                stack.run(StackCommand::Up, publisher, &CancelToken::new())
            });
            let rendered = thread::spawn(move || renderer.collect_all());
            let collected = thread::spawn(move || collector.collect_all());
            (runner, rendered, collected)
        })
        .collect();

    for ((_, resources), (runner, rendered, collected)) in runs.iter().zip(handles) {
        let outcome = runner.join().unwrap().unwrap();
        assert_eq!(outcome.summary.created, resources.len());

        let want = expected(resources);
        assert_eq!(rendered.join().unwrap(), want);
        assert_eq!(collected.join().unwrap(), want);
    }
}

/// SCENARIO: an observer that joins mid-run only sees the rest of it
#[test]
fn scenario_late_subscriber_sees_a_suffix_ending_in_one_terminal_event() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));
    let key = StageKey::new(APP, STAGE).unwrap();
    let resources = ["a", "b", "c", "d", "e", "f"];
    let engine = ScriptedEngine::creating(&resources).with_delay(Duration::from_millis(20));
    let mut stack = Stack::new(key, backend, Arc::new(engine), work.path());

    let (publisher, events) = event_channel(DEFAULT_CAPACITY);
    let early = events.subscribe();
    let runner = thread::spawn(move || stack.run(StackCommand::Up, publisher, &CancelToken::new()));

    // Join once the run is underway
    let first = early.recv().unwrap();
    assert!(matches!(first, LifecycleEvent::Started { .. }));
    let late = events.subscribe();

    runner.join().unwrap().unwrap();
    let seen = late.collect_all();
    let full = expected(&resources);

    assert!(full.ends_with(&seen), "late subscriber saw {:?}", seen);
    assert_eq!(seen.iter().filter(|e| e.is_terminal()).count(), 1);
    assert!(seen.last().unwrap().is_terminal());
}
