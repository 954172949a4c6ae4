//! Project watcher
//!
//! Watches the project tree and reports debounced batches of changed files.

use std::path::PathBuf;
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info};

use crate::application::cancel::CancelToken;

use super::cache::ContentTracker;
use super::event::WatcherState;
use super::filter::WatchFilter;

const POLL: Duration = Duration::from_millis(50);

/// notify sometimes replays events for existing files right after a watch is
/// registered
const STARTUP_COOLDOWN: Duration = Duration::from_millis(300);

pub struct ProjectWatcher {
    filter: WatchFilter,
    debounce: Duration,
}

impl ProjectWatcher {
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> Self {
        let root = root.into();
        Self {
            filter: WatchFilter::new(&root),
            debounce,
        }
    }

    /// Block until `cancel` fires, calling `on_change` with each batch.
    pub fn run<F>(&self, cancel: &CancelToken, mut on_change: F) -> notify::Result<()>
    where
        F: FnMut(Vec<PathBuf>),
    {
        let (tx, rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| {
                if let Ok(event) = res {
                    for path in event.paths {
                        let _ = tx.send(path);
                    }
                }
            },
            Config::default(),
        )?;
        watcher.watch(self.filter.root(), RecursiveMode::Recursive)?;
        info!(root = %self.filter.root().display(), "watching project");

        let cooldown_end = Instant::now() + STARTUP_COOLDOWN;
        while Instant::now() < cooldown_end {
            let _ = rx.recv_timeout(POLL);
        }

        let mut state = WatcherState::new(self.debounce);
        let mut tracker = ContentTracker::new();

        while !cancel.is_cancelled() {
            match rx.recv_timeout(POLL) {
                Ok(path) => {
                    if self.filter.is_relevant(&path) && !path.is_dir() && tracker.observe(&path)
                    {
                        debug!(path = %path.display(), "change detected");
                        state.add_change(path);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }

            if state.should_sync() {
                on_change(state.take_changes());
            }
        }
        Ok(())
    }
}
