//! File system helpers shared by the local provider, config and logging

mod atomic;
mod home;

pub use atomic::{create_exclusive, write_atomic};
pub use home::{
    default_backend_root, expand_home, stagehand_home_dir, DEFAULT_HOME_DIR,
    STAGEHAND_TEST_HOME_VAR,
};
