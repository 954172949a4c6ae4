//! Stage Key Value Object
//!
//! The `(app, stage)` pair is the unit of isolation for locking and state.
//! Both halves end up as directory names in file-backed homes, so they are
//! validated once here instead of at every backend.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons an app or stage name is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    #[error("{what} name cannot be empty")]
    Empty { what: &'static str },

    #[error("{what} name '{name}' contains '{ch}'; use letters, digits, '-', '_' or '.'")]
    InvalidChar {
        what: &'static str,
        name: String,
        ch: char,
    },

    #[error("{what} name '{name}' is reserved")]
    Reserved { what: &'static str, name: String },
}

/// Identifies one independently lockable deployment unit
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageKey {
    app: String,
    stage: String,
}

impl StageKey {
    pub fn new(app: impl Into<String>, stage: impl Into<String>) -> Result<Self, NameError> {
        let app = app.into();
        let stage = stage.into();
        validate_name("app", &app)?;
        validate_name("stage", &stage)?;
        Ok(Self { app, stage })
    }

    pub fn app(&self) -> &str {
        &self.app
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }
}

impl fmt::Display for StageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.app, self.stage)
    }
}

/// Validate a single name segment
pub fn validate_name(what: &'static str, name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty { what });
    }
    if name == "." || name == ".." {
        return Err(NameError::Reserved {
            what,
            name: name.to_string(),
        });
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(NameError::InvalidChar {
            what,
            name: name.to_string(),
            ch,
        });
    }
    Ok(())
}
