//! Coordination session published by the local server

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::StageKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinationSession {
    pub pid: u32,
    pub key: StageKey,
    pub address: SocketAddr,
    pub started_at: DateTime<Utc>,
}

/// Work handed to the session owner by its watcher or attached clients
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// Queue an `up` run
    Deploy { reason: String },
    Shutdown,
}
