//! Which paths under the project are worth redeploying for

use std::path::{Component, Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

use crate::application::stage::PROJECT_STATE_DIR;

/// Directories never watched regardless of `.gitignore`
const ALWAYS_IGNORED: &[&str] = &[PROJECT_STATE_DIR, ".git", "node_modules", "target"];

#[derive(Debug)]
pub struct WatchFilter {
    root: PathBuf,
    gitignore: Gitignore,
}

impl WatchFilter {
    /// Build from `<root>/.gitignore` if present
    pub fn new(root: &Path) -> Self {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let mut builder = GitignoreBuilder::new(&root);
        if let Some(err) = builder.add(root.join(".gitignore")) {
            // A missing file is the common case
            if root.join(".gitignore").exists() {
                warn!(error = %err, "ignoring unreadable .gitignore");
            }
        }
        let gitignore = builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "invalid .gitignore, watching everything");
            Gitignore::empty()
        });
        Self { root, gitignore }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_relevant(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        if rel.as_os_str().is_empty() {
            return false;
        }
        let hidden_dir = rel.components().any(|c| match c {
            Component::Normal(name) => ALWAYS_IGNORED.iter().any(|ignored| name == *ignored),
            _ => false,
        });
        if hidden_dir {
            return false;
        }
        !self
            .gitignore
            .matched_path_or_any_parents(rel, path.is_dir())
            .is_ignore()
    }
}
