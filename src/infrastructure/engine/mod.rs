//! Provisioning engine implementations

mod process;

pub use process::{ProcessEngine, APP_ENV, COMMAND_ENV, STAGE_ENV};
