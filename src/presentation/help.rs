//! Help text for any node of the command tree

use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use super::registry::{Command, FlagKind, Registry};
use crate::ui::theme;

pub const LEARN_MORE_URL: &str = "https://github.com/stagehand-cli/stagehand";

/// Help for `path`; unknown paths fall back to the root
pub fn render_help(registry: &Registry, path: &[&str], color: bool) -> String {
    let lineage = registry
        .lineage(path)
        .unwrap_or_else(|| vec![registry.root()]);
    let node = lineage[lineage.len() - 1];
    let full_name = lineage
        .iter()
        .map(|c| c.name)
        .collect::<Vec<_>>()
        .join(" ");

    let mut out = String::new();
    out.push_str(node.description.long.unwrap_or(node.description.short));
    out.push_str("\n\n");

    out.push_str(&heading("Usage", color));
    out.push_str(&format!("  {}\n", usage(node, &full_name)));

    if !node.children.is_empty() {
        let rows: Vec<(String, &str)> = node
            .visible_children()
            .map(|c| (c.name.to_string(), c.description.short))
            .collect();
        out.push('\n');
        out.push_str(&heading("Commands", color));
        out.push_str(&table(&rows));
    } else if !node.arguments.is_empty() {
        let rows: Vec<(String, &str)> = node
            .arguments
            .iter()
            .map(|a| (a.usage(), a.description.short))
            .collect();
        out.push('\n');
        out.push_str(&heading("Arguments", color));
        out.push_str(&table(&rows));
    }

    let flags: Vec<(String, &str)> = lineage
        .iter()
        .rev()
        .flat_map(|c| c.flags.iter())
        .map(|f| {
            let name = match f.kind {
                FlagKind::String => format!("--{} string", f.name),
                FlagKind::Bool => format!("--{}", f.name),
            };
            (name, f.description.short)
        })
        .collect();
    if !flags.is_empty() {
        out.push('\n');
        out.push_str(&heading("Flags", color));
        out.push_str(&table(&flags));
    }

    if !node.examples.is_empty() {
        out.push('\n');
        out.push_str(&heading("Examples", color));
        for example in &node.examples {
            out.push_str(&format!("  {}\n", dim(example.description.short, color)));
            out.push_str(&format!("  $ {}\n", example.content));
        }
    }

    out.push_str(&format!("\nLearn more at {}\n", LEARN_MORE_URL));
    out
}

fn usage(node: &Command, full_name: &str) -> String {
    let mut usage = full_name.to_string();
    if !node.children.is_empty() {
        usage.push_str(" <command>");
    }
    for argument in &node.arguments {
        usage.push(' ');
        usage.push_str(&argument.usage());
    }
    usage.push_str(" [flags]");
    usage
}

fn table(rows: &[(String, &str)]) -> String {
    let width = rows.iter().map(|(name, _)| name.width()).max().unwrap_or(0);
    let mut out = String::new();
    for (name, text) in rows {
        let pad = width - name.width();
        out.push_str(&format!("  {}{}  {}\n", name, " ".repeat(pad), text));
    }
    out
}

fn heading(title: &str, color: bool) -> String {
    if color {
        format!("{}\n", format!("{}:", title).bold().with(theme::colors::INFO))
    } else {
        format!("{}:\n", title)
    }
}

fn dim(text: &str, color: bool) -> String {
    if color {
        format!("{}", text.with(theme::colors::DIM))
    } else {
        text.to_string()
    }
}
