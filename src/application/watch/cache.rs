//! Content tracking so editor saves without edits do not trigger deploys

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

pub fn compute_content_hash(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Debug, Default)]
pub struct ContentTracker {
    hashes: HashMap<PathBuf, String>,
}

impl ContentTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current content of `path`; returns whether it differs from
    /// what was last seen. Deleted files count as changed once.
    pub fn observe(&mut self, path: &Path) -> bool {
        match std::fs::read(path) {
            Ok(content) => {
                let hash = compute_content_hash(&content);
                match self.hashes.get(path) {
                    Some(old) if *old == hash => false,
                    _ => {
                        self.hashes.insert(path.to_path_buf(), hash);
                        true
                    }
                }
            }
            Err(_) => self.hashes.remove(path).is_some() || !path.exists(),
        }
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}
