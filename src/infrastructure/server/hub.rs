//! Fan-out of event frames to attached clients
//!
//! Unlike the per-run event channel, the hub outlives individual runs and
//! numbers frames across them. A subscriber whose queue fills up is dropped
//! rather than allowed to stall the session.

use std::sync::{Arc, Mutex};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::domain::entities::{EventFrame, LifecycleEvent};
use crate::domain::value_objects::StageKey;

pub const DEFAULT_HUB_CAPACITY: usize = 1024;

#[derive(Debug, Default)]
struct HubState {
    subscribers: Vec<Sender<EventFrame>>,
    next_seq: u64,
    closed: bool,
}

#[derive(Debug, Clone)]
pub struct FrameHub {
    inner: Arc<Mutex<HubState>>,
    capacity: usize,
}

impl Default for FrameHub {
    fn default() -> Self {
        Self::new(DEFAULT_HUB_CAPACITY)
    }
}

impl FrameHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubState::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self) -> Receiver<EventFrame> {
        let (tx, rx) = bounded(self.capacity);
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !state.closed {
            state.subscribers.push(tx);
        }
        rx
    }

    /// Stamp `event` with the next sequence number and deliver it
    pub fn publish(&self, key: &StageKey, event: LifecycleEvent) -> u64 {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let seq = state.next_seq;
        state.next_seq += 1;
        let frame = EventFrame {
            key: key.clone(),
            seq,
            event,
        };
        state.subscribers.retain(|tx| match tx.try_send(frame.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(seq, "dropping lagging subscriber");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
        seq
    }

    /// End every subscription
    pub fn close(&self) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.subscribers.clear();
        state.closed = true;
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscribers
            .len()
    }
}
