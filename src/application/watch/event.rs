//! Debounce state for the project watcher

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Default quiet period after the last change
pub const DEBOUNCE_MS: u64 = 200;

/// Collects changed paths until the project has been quiet for `debounce`
#[derive(Debug)]
pub struct WatcherState {
    debounce: Duration,
    pending_changes: BTreeSet<PathBuf>,
    last_change: Option<Instant>,
}

impl Default for WatcherState {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEBOUNCE_MS))
    }
}

impl WatcherState {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            pending_changes: BTreeSet::new(),
            last_change: None,
        }
    }

    pub fn add_change(&mut self, path: PathBuf) {
        self.add_change_at(path, Instant::now());
    }

    pub(crate) fn add_change_at(&mut self, path: PathBuf, at: Instant) {
        self.pending_changes.insert(path);
        self.last_change = Some(at);
    }

    /// Debounce period has passed and something is pending
    pub fn should_sync(&self) -> bool {
        self.should_sync_at(Instant::now())
    }

    pub(crate) fn should_sync_at(&self, now: Instant) -> bool {
        match self.last_change {
            Some(last) => {
                !self.pending_changes.is_empty() && now.saturating_duration_since(last) >= self.debounce
            }
            None => false,
        }
    }

    /// Take all pending changes in path order, resetting state
    pub fn take_changes(&mut self) -> Vec<PathBuf> {
        self.last_change = None;
        std::mem::take(&mut self.pending_changes).into_iter().collect()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending_changes.is_empty()
    }
}
