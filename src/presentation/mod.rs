//! Presentation Layer
//!
//! - `registry` - command tree types and the argv dispatcher
//! - `tree` - the stagehand command tree
//! - `help` - help rendering for any node
//! - `context` - per-invocation state for handlers
//! - `factory` - wires config into backend, engine and stack
//! - `cli` - process entry

pub mod cli;
pub mod context;
pub mod factory;
pub mod help;
pub mod registry;
pub mod tree;

pub use cli::run;
pub use context::CommandContext;
pub use factory::Project;
pub use registry::{Dispatch, FlagValue, Invocation, Registry, RegistryError};
