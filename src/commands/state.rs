use std::io;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

use crate::application::state_edit::{edit_state, EditOutcome};
use crate::presentation::context::CommandContext;

pub const EDITOR_ENV: &str = "EDITOR";
pub const DEFAULT_EDITOR: &str = "vi";

pub fn cmd_state_edit(ctx: &mut CommandContext) -> Result<()> {
    let editor = std::env::var(EDITOR_ENV)
        .ok()
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

    let project = ctx.project()?;
    let mut stack = project.stack();
    let key = project.key.clone();
    let outcome = edit_state(
        &mut stack,
        |path| run_editor(&editor, path),
        |summary| {
            println!(
                "Edited the state of {}: {} line(s) added, {} removed",
                key, summary.inserted, summary.deleted
            )
        },
    )
    .with_context(|| format!("failed to edit the state of {}", project.key))?;

    match outcome {
        EditOutcome::Unchanged => println!("No changes to the state of {}", project.key),
        EditOutcome::Pushed(_) => println!("Updated the state of {}", project.key),
    }
    Ok(())
}

/// `$EDITOR` may carry arguments, e.g. `code --wait`
fn run_editor(editor: &str, path: &Path) -> io::Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(DEFAULT_EDITOR);
    let status = Command::new(program).args(parts).arg(path).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(io::Error::other(format!("{} exited with {}", program, status)))
    }
}
