//! Common test utilities for stagehand integration and scenario tests.
//!
//! This module provides:
//! - `TestEnv`: isolated project + home directories and a binary runner
//! - `ScriptedEngine`: in-process provisioning engine for library tests
//! - Fixtures: reusable engine scripts and config snippets

#![allow(dead_code)]

pub mod engine;
pub mod env;
pub mod fixtures;

pub use engine::*;
pub use env::*;
pub use fixtures::*;
