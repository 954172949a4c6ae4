//! Stack Lifecycle
//!
//! One `Stack` drives one `(app, stage)`:
//!
//! ```text
//! Idle -> Locking -> Running -> Unlocking -> Idle
//!            |          |
//!            |          +-> Cancelling -> Unlocking -> Idle
//!            +-> Failed(LockHeld)
//! ```
//!
//! `Locked` covers the window between an explicit `lock()` and `unlock()`
//! used by state edits and imports.

mod error;
mod machine;
mod state;

#[cfg(test)]
mod tests;

pub use error::StackError;
pub use machine::{Stack, DEFAULT_STOP_TIMEOUT, POLL_INTERVAL};
pub use state::{FailureKind, StackState};
