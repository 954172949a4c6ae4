//! Domain Ports (Interfaces)
//!
//! These traits define the boundaries of the domain layer.
//! Infrastructure layer provides concrete implementations.

pub mod backend;
pub mod engine;

pub use backend::{Backend, BackendError, BackendResult, LinkMap, SecretMap};
pub use engine::{
    EngineControl, EngineError, EngineMessage, EngineRequest, EngineRun, ProvisioningEngine,
};
