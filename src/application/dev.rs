//! Dev session loop run by the coordination server owner
//!
//! Runs an `up` at start and again whenever the watcher or an attached
//! client asks for one. Runs never overlap: requests that arrive during a
//! run are coalesced into one follow-up run.

use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, warn};

use crate::application::cancel::CancelToken;
use crate::application::events::{event_channel, DEFAULT_CAPACITY};
use crate::application::stack::{Stack, StackError};
use crate::application::watch::ProjectWatcher;
use crate::domain::entities::{
    DiagnosticLevel, LifecycleEvent, RunOutcome, SessionCommand, StackCommand,
};
use crate::infrastructure::server::FrameHub;

const POLL: Duration = Duration::from_millis(50);

pub struct DevSession {
    stack: Stack,
    hub: FrameHub,
    watcher: Option<ProjectWatcher>,
    deploy_on_start: bool,
}

/// What happened to one triggered run
#[derive(Debug)]
pub enum RunReport {
    Completed(RunOutcome),
    Failed(StackError),
}

impl DevSession {
    pub fn new(stack: Stack, hub: FrameHub) -> Self {
        Self {
            stack,
            hub,
            watcher: None,
            deploy_on_start: true,
        }
    }

    pub fn with_watcher(mut self, watcher: ProjectWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    pub fn deploy_on_start(mut self, enabled: bool) -> Self {
        self.deploy_on_start = enabled;
        self
    }

    /// Serve until `cancel` fires or a shutdown is requested.
    ///
    /// `requests` is the sending side of `commands`; the watcher queues its
    /// deploys through it. Returns the report of every run in order.
    pub fn run(
        mut self,
        requests: Sender<SessionCommand>,
        commands: Receiver<SessionCommand>,
        cancel: &CancelToken,
    ) -> Vec<RunReport> {
        let watcher_thread = self.watcher.take().map(|watcher| {
            let cancel = cancel.clone();
            thread::spawn(move || {
                let result = watcher.run(&cancel, |changes| {
                    let reason = match changes.as_slice() {
                        [one] => format!("{} changed", one.display()),
                        many => format!("{} files changed", many.len()),
                    };
                    let _ = requests.send(SessionCommand::Deploy { reason });
                });
                if let Err(err) = result {
                    warn!(error = %err, "file watcher stopped");
                }
            })
        });

        let mut reports = Vec::new();
        let mut pending = self.deploy_on_start.then(|| "session started".to_string());

        while !cancel.is_cancelled() {
            if let Some(reason) = pending.take() {
                reports.push(self.run_once(&reason, cancel));
                continue;
            }
            match commands.recv_timeout(POLL) {
                Ok(SessionCommand::Deploy { reason }) => {
                    // Coalesce a burst of requests into one run
                    let mut reason = reason;
                    while let Ok(next) = commands.try_recv() {
                        match next {
                            SessionCommand::Deploy { reason: r } => reason = r,
                            SessionCommand::Shutdown => {
                                cancel.cancel();
                                break;
                            }
                        }
                    }
                    if !cancel.is_cancelled() {
                        pending = Some(reason);
                    }
                }
                Ok(SessionCommand::Shutdown) => {
                    info!("shutdown requested");
                    cancel.cancel();
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // The watcher polls the same token
        cancel.cancel();
        if let Some(handle) = watcher_thread {
            let _ = handle.join();
        }
        info!(runs = reports.len(), "dev session ended");
        reports
    }

    fn run_once(&mut self, reason: &str, cancel: &CancelToken) -> RunReport {
        info!(key = %self.stack.key(), reason, "deploying");
        let key = self.stack.key().clone();
        let (publisher, events) = event_channel(DEFAULT_CAPACITY);
        let subscription = events.subscribe();
        let hub = self.hub.clone();
        let forward_key = key.clone();
        let forwarder = thread::spawn(move || {
            for event in subscription {
                hub.publish(&forward_key, event);
            }
        });

        let result = self.stack.run(StackCommand::Up, publisher, cancel);
        if forwarder.join().is_err() {
            debug!("event forwarder panicked");
        }

        match result {
            Ok(outcome) => RunReport::Completed(outcome),
            Err(err) => {
                if err.is_lock_held() {
                    // No run started, so attached clients would otherwise see nothing
                    self.hub.publish(
                        &key,
                        LifecycleEvent::Diagnostic {
                            level: DiagnosticLevel::Error,
                            message: err.to_string(),
                        },
                    );
                }
                warn!(key = %key, error = %err, "dev run failed");
                RunReport::Failed(err)
            }
        }
    }
}
