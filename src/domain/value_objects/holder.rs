//! Lock holder identity
//!
//! Every `Stack` instance gets its own holder id, so two stacks in the same
//! process compete for the lock exactly like two processes would.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HolderId(String);

impl HolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// `user@host:pid/nonce` for the current process
    pub fn current() -> Self {
        let user = current_username().unwrap_or_else(|| "unknown".to_string());
        let host = hostname_or_default();
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}@{}:{}/{}",
            user,
            host,
            std::process::id(),
            &nonce[..8]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Login name of the current user, from `USER` or `USERNAME`
pub fn current_username() -> Option<String> {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
}

fn hostname_or_default() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("HOST"))
        .unwrap_or_else(|_| "localhost".to_string())
}
