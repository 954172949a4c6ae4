//! Home directory resolution with test isolation support.
//!
//! On Windows, `dirs::home_dir()` asks the system API rather than reading
//! environment variables, so overriding `HOME` in tests has no effect there.
//! `STAGEHAND_TEST_HOME` takes precedence everywhere.

use std::path::{Path, PathBuf};

/// Overrides `dirs::home_dir()` for every internal path
pub const STAGEHAND_TEST_HOME_VAR: &str = "STAGEHAND_TEST_HOME";

/// Directory under the user's home holding the local provider's data
pub const DEFAULT_HOME_DIR: &str = ".stagehand/home";

pub fn stagehand_home_dir() -> Option<PathBuf> {
    std::env::var(STAGEHAND_TEST_HOME_VAR)
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match stagehand_home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Default root for the local home provider: `~/.stagehand/home`
pub fn default_backend_root() -> Option<PathBuf> {
    stagehand_home_dir().map(|home| home.join(DEFAULT_HOME_DIR))
}
