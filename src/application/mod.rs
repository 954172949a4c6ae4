//! Application Layer
//!
//! Use cases that orchestrate the domain ports. Depends on the domain layer;
//! infrastructure is reached through the ports except where a use case needs
//! a concrete transport (the dev session's frame hub).
//!
//! ## Use Cases
//!
//! - `stage` - resolve which stage an invocation targets
//! - `stack` - lock / run / unlock lifecycle for one stage
//! - `events` - ordered event channel for a single run
//! - `dev` - the coordination server's run loop
//! - `watch` - debounced project file watching
//! - `secrets`, `shell`, `state_edit` - smaller command flows

pub mod cancel;
pub mod dev;
pub mod events;
pub mod secrets;
pub mod shell;
pub mod stack;
pub mod stage;
pub mod state_edit;
pub mod watch;

pub use cancel::CancelToken;
pub use dev::{DevSession, RunReport};
pub use events::{event_channel, EventHub, EventPublisher, Subscription, DEFAULT_CAPACITY};
pub use secrets::SecretError;
pub use stack::{FailureKind, Stack, StackError, StackState};
pub use stage::{guess_stage, StageError, StagePrompt, StageResolver, StageSource};
pub use state_edit::{edit_state, EditError, EditOutcome, EditSummary};
pub use watch::ProjectWatcher;
