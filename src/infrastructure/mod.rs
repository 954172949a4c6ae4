//! Infrastructure Layer
//!
//! Concrete implementations of domain ports.
//! This layer handles all I/O operations.
//!
//! ## Structure
//!
//! - `backend/` - home providers (`LocalBackend`)
//! - `engine/` - provisioning engines (`ProcessEngine`)
//! - `server/` - the per-project coordination server and its client
//! - `fs/` - atomic writes and home directory helpers

pub mod backend;
pub mod engine;
pub mod fs;
pub mod server;

pub use backend::LocalBackend;
pub use engine::ProcessEngine;
pub use server::{ServerClient, ServerError, ServerHandle, ServerStart};
