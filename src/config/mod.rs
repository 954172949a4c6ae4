//! Project configuration
//!
//! Precedence:
//! 1. CLI flags (highest priority)
//! 2. Environment variables (`STAGEHAND_HOME`, `STAGEHAND_ENGINE`)
//! 3. Project config (`stagehand.toml`, nearest ancestor of the working dir)
//! 4. Built-in defaults (lowest priority)

mod loader;
mod types;

pub use loader::{
    find_config, load_with_warnings, with_env_overrides, ConfigError, ProjectConfig, CONFIG_FILE,
    ENGINE_ENV, HOME_ENV,
};
pub use types::{
    AppConfig, Config, ConfigWarning, DevConfig, EngineConfig, HomeConfig, HomeProvider,
};
