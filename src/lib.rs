//! Stagehand - control plane for declarative deployments
//!
//! Resolves which stage of an app a command targets, serializes mutating
//! operations on that stage through a lock held in a shared home provider,
//! drives a provisioning engine and relays its events to the terminal or to
//! other processes attached to the project's dev session.

pub mod application;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod logging;
pub mod presentation;
pub mod ui;

pub use application::{CancelToken, Stack, StackError, StackState};
pub use config::{Config, ConfigError, ProjectConfig};
pub use domain::entities::{LifecycleEvent, LockRecord, StackCommand};
pub use domain::value_objects::{HolderId, StageKey};
pub use error::{classify, ErrorKind, StagehandError, StagehandResult};
pub use logging::LogSink;
pub use presentation::{Dispatch, Registry};
