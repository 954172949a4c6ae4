//! Home providers implementing the `Backend` port

mod local;

pub use local::{LocalBackend, StateMeta};
