//! Error rendering for the CLI entry point

use std::path::Path;

use crossterm::style::Stylize;

use crate::error::{classify, user_message, ErrorKind};
use crate::ui::context::UiContext;
use crate::ui::icon::Icon;
use crate::ui::theme;

pub const UNEXPECTED_MESSAGE: &str =
    "Unexpected error occurred. Please check the logs or run with --verbose for more details.";

/// Text shown to the operator for a failed command.
///
/// Actionable errors print their own message; anything else prints a generic
/// line and the log location, since the cause chain only goes to the log.
pub fn format_error(err: &anyhow::Error, ui: &UiContext, log_path: Option<&Path>) -> String {
    let kind = classify(err);
    let icon = Icon::Error.colored(ui.color, ui.unicode);
    let mut out = if kind.is_user_actionable() {
        format!("{} {}\n", icon, user_message(err))
    } else {
        format!("{} {}\n", icon, UNEXPECTED_MESSAGE)
    };

    if let Some(hint) = hint(kind) {
        let arrow = Icon::Arrow.render(ui.unicode);
        let line = format!("  {} {}", arrow, hint);
        if ui.color {
            out.push_str(&format!("{}\n", line.with(theme::colors::DIM)));
        } else {
            out.push_str(&line);
            out.push('\n');
        }
    }

    if !kind.is_user_actionable() {
        if let Some(path) = log_path {
            out.push_str(&format!("  Logs: {}\n", path.display()));
        }
    }
    out
}

fn hint(kind: ErrorKind) -> Option<&'static str> {
    match kind {
        ErrorKind::LockHeld => Some("If no deploy is running, clear it with `stagehand unlock`."),
        ErrorKind::NonInteractive => Some("Pass --stage=<name> to pick a stage."),
        ErrorKind::ServerAlreadyRunning => {
            Some("Run `stagehand dev` to attach to the running session.")
        }
        _ => None,
    }
}
