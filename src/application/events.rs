//! Event channel between a stack run and its observers
//!
//! One publisher, any number of subscribers. Each subscriber owns a bounded
//! queue; the publisher pushes every event to every live queue in order, so
//! a slow consumer applies backpressure instead of losing events. A
//! subscriber that joins late only sees what is published after it joined.
//!
//! The publisher closes the channel after the terminal event. Subscribers
//! observe that as end-of-stream.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::domain::entities::LifecycleEvent;

/// Default per-subscriber queue depth
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Default)]
struct Subscribers {
    senders: Vec<Sender<LifecycleEvent>>,
    closed: bool,
}

/// Create a channel for one run
pub fn event_channel(capacity: usize) -> (EventPublisher, EventHub) {
    let shared = Arc::new(Mutex::new(Subscribers::default()));
    (
        EventPublisher {
            shared: shared.clone(),
            started: false,
            finished: false,
        },
        EventHub {
            shared,
            capacity: capacity.max(1),
        },
    )
}

/// Subscription side of a channel; cheap to clone
#[derive(Debug, Clone)]
pub struct EventHub {
    shared: Arc<Mutex<Subscribers>>,
    capacity: usize,
}

impl EventHub {
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = bounded(self.capacity);
        let mut subs = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        if !subs.closed {
            subs.senders.push(tx);
        }
        // A closed channel drops `tx` here, so the subscription ends at once.
        Subscription { receiver: rx }
    }

    pub fn is_closed(&self) -> bool {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .closed
    }
}

/// Producer side. Not `Clone`: a run has exactly one writer.
#[derive(Debug)]
pub struct EventPublisher {
    shared: Arc<Mutex<Subscribers>>,
    started: bool,
    finished: bool,
}

impl EventPublisher {
    /// Deliver an event to every current subscriber.
    ///
    /// Returns `false` once the channel has been closed by a terminal event.
    pub fn emit(&mut self, event: LifecycleEvent) -> bool {
        if self.finished {
            tracing::debug!(?event, "event after terminal event dropped");
            return false;
        }
        if matches!(event, LifecycleEvent::Started { .. }) {
            self.started = true;
        }
        let terminal = event.is_terminal();

        let mut subs = self.shared.lock().unwrap_or_else(|e| e.into_inner());
        subs.senders.retain(|tx| tx.send(event.clone()).is_ok());
        if terminal {
            subs.senders.clear();
            subs.closed = true;
            self.finished = true;
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .senders
            .len()
    }
}

impl Drop for EventPublisher {
    fn drop(&mut self) {
        if self.started && !self.finished {
            self.emit(LifecycleEvent::Failed {
                error: "run ended without a result".to_string(),
            });
        } else {
            let mut subs = self.shared.lock().unwrap_or_else(|e| e.into_inner());
            subs.senders.clear();
            subs.closed = true;
        }
    }
}

/// Receiving end of one subscriber
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<LifecycleEvent>,
}

impl Subscription {
    /// Next event, or `None` at end of stream
    pub fn recv(&self) -> Option<LifecycleEvent> {
        self.receiver.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<LifecycleEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain until end of stream
    pub fn collect_all(self) -> Vec<LifecycleEvent> {
        self.into_iter().collect()
    }
}

impl IntoIterator for Subscription {
    type Item = LifecycleEvent;
    type IntoIter = crossbeam_channel::IntoIter<LifecycleEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.receiver.into_iter()
    }
}
