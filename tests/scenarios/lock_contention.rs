//! Scenario: several invocations race for the same stage
//!
//! Journey: a teammate and CI deploy the same stage at the same moment.
//!
//! Success Criteria:
//! - Exactly one of them gets the lock
//! - The others fail fast naming the winner
//! - The lock is free once the winner is done, whatever happened

use std::sync::{Arc, Barrier};
use std::thread;

use tempfile::tempdir;

use crate::common::*;
use stagehand::application::events::{event_channel, DEFAULT_CAPACITY};
use stagehand::domain::ports::Backend;
use stagehand::infrastructure::backend::LocalBackend;
use stagehand::{CancelToken, HolderId, Stack, StackCommand, StackError, StageKey};

const RACERS: usize = 8;

fn key() -> StageKey {
    StageKey::new(APP, STAGE).unwrap()
}

/// SCENARIO: N stacks lock the same stage at once
#[test]
fn scenario_concurrent_lock_has_exactly_one_winner() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));
    let engine = Arc::new(ScriptedEngine::creating(&["Bucket"]));
    let attempted = Arc::new(Barrier::new(RACERS));
    let start = Arc::new(Barrier::new(RACERS));

    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let backend = backend.clone();
            let engine = engine.clone();
            let work = work.path().join(format!("racer-{}", i));
            let start = start.clone();
            let attempted = attempted.clone();
            thread::spawn(move || {
                let mut stack = Stack::new(key(), backend, engine, work)
                    .with_holder(HolderId::new(format!("racer-{}", i)));
                start.wait();
                let outcome = stack.lock().map(|record| record.holder.to_string());
                // Hold until everyone has tried
                attempted.wait();
                match outcome {
                    Ok(holder) => {
                        stack.unlock().unwrap();
                        Ok(holder)
                    }
                    Err(err) => Err(err),
                }
            })
        })
        .collect();

    let results: Vec<Result<String, StackError>> =
        handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "results: {:?}", results);
    let winner = winners[0];
    for result in &results {
        if let Err(err) = result {
            match err {
                StackError::LockHeld { current } => assert_eq!(&current.holder.to_string(), winner),
                other => panic!("unexpected error {:?}", other),
            }
        }
    }
    assert_eq!(backend.current_lock(&key()).unwrap(), None);
}

/// SCENARIO: a deploy that loses the race does not disturb the winner
#[test]
fn scenario_loser_does_not_run_the_engine() {
    let home = tempdir().unwrap();
    let work = tempdir().unwrap();
    let backend = Arc::new(LocalBackend::new(home.path()));
    let engine = Arc::new(ScriptedEngine::creating(&["Bucket"]));

    let mut winner = Stack::new(key(), backend.clone(), engine.clone(), work.path())
        .with_holder(HolderId::new("alice@laptop"));
    winner.lock().unwrap();

    let mut loser = Stack::new(key(), backend.clone(), engine.clone(), work.path())
        .with_holder(HolderId::new("ci@runner"));
    let (publisher, events) = event_channel(DEFAULT_CAPACITY);
    let subscription = events.subscribe();
    let err = loser
        .run(StackCommand::Up, publisher, &CancelToken::new())
        .unwrap_err();

    assert!(err.is_lock_held());
    assert!(err.to_string().contains("locked by alice@laptop"));
    assert!(subscription.collect_all().is_empty());
    assert_eq!(engine.starts(), 0);

    winner.unlock().unwrap();
    assert_eq!(backend.current_lock(&key()).unwrap(), None);

    let (publisher, _events) = event_channel(DEFAULT_CAPACITY);
    loser
        .run(StackCommand::Up, publisher, &CancelToken::new())
        .unwrap();
    assert_eq!(engine.starts(), 1);
}
