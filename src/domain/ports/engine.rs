//! Provisioning engine port
//!
//! The engine computes and applies infrastructure changes. This crate only
//! starts it with a command name, relays what it reports and asks it to stop.

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::entities::{ChangeSummary, DiagnosticLevel, StackCommand};
use crate::domain::value_objects::StageKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineRequest {
    pub key: StageKey,
    pub command: StackCommand,
}

/// One message from a running engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineMessage {
    Progress {
        resource: String,
        status: String,
    },
    Diagnostic {
        level: DiagnosticLevel,
        message: String,
    },
    Finished {
        #[serde(default)]
        summary: ChangeSummary,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no engine command configured")]
    NotConfigured,

    #[error("failed to start engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stop engine: {0}")]
    Stop(#[source] std::io::Error),
}

/// Handle used to interrupt a run in progress
pub trait EngineControl: Send {
    fn stop(&mut self) -> Result<(), EngineError>;
}

/// A started engine run
///
/// The message channel disconnects once the engine is gone. A well-behaved
/// engine sends exactly one `Finished` or `Error` before that.
pub struct EngineRun {
    pub messages: Receiver<EngineMessage>,
    pub control: Box<dyn EngineControl>,
}

pub trait ProvisioningEngine: Send + Sync {
    fn start(&self, request: &EngineRequest) -> Result<EngineRun, EngineError>;
}
