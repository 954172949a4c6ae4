//! Domain Value Objects
//!
//! Immutable value types that represent domain concepts.

mod holder;
mod stage_key;

pub use holder::{current_username, HolderId};
pub use stage_key::{validate_name, NameError, StageKey};
