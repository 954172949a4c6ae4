//! Line-oriented rendering of lifecycle events

use std::io::{self, Write};
use std::thread::{self, JoinHandle};

use crossterm::style::Stylize;

use crate::application::events::Subscription;
use crate::domain::entities::{ChangeSummary, DiagnosticLevel, LifecycleEvent};
use crate::domain::value_objects::StageKey;
use crate::ui::context::UiContext;
use crate::ui::icon::Icon;
use crate::ui::theme;

/// One line for one event
pub fn format_event(key: &StageKey, event: &LifecycleEvent, ui: &UiContext) -> String {
    match event {
        LifecycleEvent::Started { command } => format!(
            "{} {} {}",
            Icon::Progress.colored(ui.color, ui.unicode),
            command,
            dim(&key.to_string(), ui)
        ),
        LifecycleEvent::Progress { resource, status } => format!(
            "  {} {} {}",
            Icon::Arrow.colored(ui.color, ui.unicode),
            resource,
            dim(status, ui)
        ),
        LifecycleEvent::Diagnostic { level, message } => {
            let icon = match level {
                DiagnosticLevel::Info => Icon::Info,
                DiagnosticLevel::Warn => Icon::Warning,
                DiagnosticLevel::Error => Icon::Error,
            };
            format!("  {} {}", icon.colored(ui.color, ui.unicode), message)
        }
        LifecycleEvent::Completed { outcome } => format!(
            "{} {} complete: {}",
            Icon::Success.colored(ui.color, ui.unicode),
            outcome.command,
            summarize(&outcome.summary)
        ),
        LifecycleEvent::Failed { error } => format!(
            "{} failed: {}",
            Icon::Error.colored(ui.color, ui.unicode),
            error
        ),
    }
}

pub fn summarize(summary: &ChangeSummary) -> String {
    if summary.is_noop() {
        return "no changes".to_string();
    }
    let mut parts = Vec::new();
    for (count, label) in [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.deleted, "deleted"),
    ] {
        if count > 0 {
            parts.push(format!("{} {}", count, label));
        }
    }
    parts.join(", ")
}

fn dim(text: &str, ui: &UiContext) -> String {
    if ui.color {
        format!("{}", text.with(theme::colors::DIM))
    } else {
        text.to_string()
    }
}

/// Print every event of a subscription to stderr until the run ends
pub fn spawn_renderer(key: StageKey, subscription: Subscription, ui: UiContext) -> JoinHandle<()> {
    thread::spawn(move || {
        let stderr = io::stderr();
        for event in subscription {
            let line = format_event(&key, &event, &ui);
            let mut out = stderr.lock();
            let _ = writeln!(out, "{}", line);
        }
    })
}
