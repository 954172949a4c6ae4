//! Domain Entities
//!
//! - `LockRecord` - advisory lock held in the backend
//! - `LifecycleEvent` - ordered run events
//! - `CoordinationSession` - the live dev server for a project
//! - `ImportSpec` - a resource to adopt into tracked state
//! - state blob validation

mod event;
mod import;
mod lock_record;
mod session;
mod state_blob;

pub use event::{
    ChangeSummary, DiagnosticLevel, EventFrame, LifecycleEvent, RunOutcome, StackCommand,
};
pub use import::ImportSpec;
pub use lock_record::LockRecord;
pub use session::{CoordinationSession, SessionCommand};
pub use state_blob::{validate_state_blob, EMPTY_STATE};
