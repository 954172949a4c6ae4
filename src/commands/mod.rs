//! Command handlers
//!
//! One function per leaf of the command tree. Handlers return
//! `anyhow::Result` and add context at the boundary; the entry point decides
//! how much of an error to show.

pub mod dev;
pub mod import;
pub mod info;
pub mod secret;
pub mod shell;
pub mod stack;
pub mod state;

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Failures of a child process started on the user's behalf
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' exited with {status}")]
    ChildFailed { program: String, status: ExitStatus },
}
