//! In-process provisioning engine for library-level tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;

use stagehand::domain::entities::ChangeSummary;
use stagehand::domain::ports::{
    EngineControl, EngineError, EngineMessage, EngineRequest, EngineRun, ProvisioningEngine,
};

/// Replays `script` from a background thread, pausing `delay` between messages
pub struct ScriptedEngine {
    script: Vec<EngineMessage>,
    delay: Duration,
    starts: AtomicUsize,
}

impl ScriptedEngine {
    pub fn new(script: Vec<EngineMessage>) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            starts: AtomicUsize::new(0),
        }
    }

    /// `resources` progress messages followed by a finish
    pub fn creating(resources: &[&str]) -> Self {
        let mut script: Vec<EngineMessage> = resources.iter().map(|r| progress(r)).collect();
        script.push(finished(resources.len()));
        Self::new(script)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// How many runs have been started
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

struct NoopControl;

impl EngineControl for NoopControl {
    fn stop(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

impl ProvisioningEngine for ScriptedEngine {
    fn start(&self, _request: &EngineRequest) -> Result<EngineRun, EngineError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = unbounded();
        let script = self.script.clone();
        let delay = self.delay;
        thread::spawn(move || {
            for message in script {
                if !delay.is_zero() {
                    thread::sleep(delay);
                }
                if tx.send(message).is_err() {
                    break;
                }
            }
        });
        Ok(EngineRun {
            messages: rx,
            control: Box::new(NoopControl),
        })
    }
}

pub fn progress(resource: &str) -> EngineMessage {
    EngineMessage::Progress {
        resource: resource.to_string(),
        status: "creating".to_string(),
    }
}

pub fn finished(created: usize) -> EngineMessage {
    EngineMessage::Finished {
        summary: ChangeSummary {
            created,
            ..ChangeSummary::default()
        },
    }
}
