//! Lifecycle events
//!
//! Produced by a stack run, consumed by renderers and attached clients.
//! Serialized as one JSON object per line when crossing a process boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::StageKey;

/// Operation a run asks the provisioning engine to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackCommand {
    Up,
    Destroy,
    Refresh,
}

impl StackCommand {
    /// Name handed to the engine
    pub fn as_str(&self) -> &'static str {
        match self {
            StackCommand::Up => "up",
            StackCommand::Destroy => "destroy",
            StackCommand::Refresh => "refresh",
        }
    }
}

impl fmt::Display for StackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Info,
    Warn,
    Error,
}

/// Resource counts reported by the engine when it finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSummary {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub deleted: usize,
    #[serde(default)]
    pub same: usize,
}

impl ChangeSummary {
    pub fn is_noop(&self) -> bool {
        self.created == 0 && self.updated == 0 && self.deleted == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub command: StackCommand,
    #[serde(default)]
    pub summary: ChangeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    Started {
        command: StackCommand,
    },
    Progress {
        resource: String,
        status: String,
    },
    Diagnostic {
        level: DiagnosticLevel,
        message: String,
    },
    Completed {
        outcome: RunOutcome,
    },
    Failed {
        error: String,
    },
}

impl LifecycleEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleEvent::Completed { .. } | LifecycleEvent::Failed { .. }
        )
    }
}

/// An event tagged with the stage it belongs to, as sent to attached clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFrame {
    pub key: StageKey,
    pub seq: u64,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}
