//! Manual state edits: pull under the lock, hand to an editor, push back

use std::fs;
use std::io;
use std::path::Path;

use similar::{ChangeTag, TextDiff};
use thiserror::Error;
use tracing::info;

use crate::application::stack::{Stack, StackError};

#[derive(Debug, Error)]
pub enum EditError {
    #[error(transparent)]
    Stack(#[from] StackError),

    #[error("editor failed: {0}")]
    Editor(#[source] io::Error),

    #[error("failed to read edited state {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Line counts of an edit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    pub inserted: usize,
    pub deleted: usize,
}

impl EditSummary {
    pub fn between(before: &str, after: &str) -> Self {
        let diff = TextDiff::from_lines(before, after);
        let mut summary = EditSummary::default();
        for change in diff.iter_all_changes() {
            match change.tag() {
                ChangeTag::Insert => summary.inserted += 1,
                ChangeTag::Delete => summary.deleted += 1,
                ChangeTag::Equal => {}
            }
        }
        summary
    }

    pub fn is_empty(&self) -> bool {
        self.inserted == 0 && self.deleted == 0
    }
}

/// Outcome of a completed edit session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing changed; nothing was pushed
    Unchanged,
    Pushed(EditSummary),
}

/// Run one edit window. The lock is released on every path.
///
/// `on_edited` sees the summary of a non-empty edit before it is pushed, so it
/// is reported even when the push rejects the result.
pub fn edit_state<F, S>(stack: &mut Stack, editor: F, on_edited: S) -> Result<EditOutcome, EditError>
where
    F: FnOnce(&Path) -> io::Result<()>,
    S: FnOnce(&EditSummary),
{
    stack.with_lock(|stack| {
        let path = stack.pull_state()?;
        let before = read(&path)?;
        editor(&path).map_err(EditError::Editor)?;
        let after = read(&path)?;

        let summary = EditSummary::between(&before, &after);
        if summary.is_empty() {
            info!(key = %stack.key(), "state unchanged");
            return Ok(EditOutcome::Unchanged);
        }
        on_edited(&summary);
        stack.push_state()?;
        Ok(EditOutcome::Pushed(summary))
    })
}

fn read(path: &Path) -> Result<String, EditError> {
    fs::read_to_string(path).map_err(|source| EditError::Read {
        path: path.display().to_string(),
        source,
    })
}
