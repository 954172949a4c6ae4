//! Domain Layer
//!
//! Types and ports shared by every other layer. Nothing here touches the file
//! system or the network.
//!
//! ## Structure
//!
//! - `entities/` - lock records, lifecycle events, sessions, import specs
//! - `value_objects/` - `StageKey`, `HolderId`
//! - `ports/` - `Backend` and `ProvisioningEngine` traits

pub mod entities;
pub mod ports;
pub mod value_objects;
