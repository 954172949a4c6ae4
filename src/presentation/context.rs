//! Per-invocation state handed to command handlers

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use tracing::{debug, info};

use super::factory::Project;
use super::registry::Invocation;
use crate::application::cancel::CancelToken;
use crate::application::stage::StageResolver;
use crate::config::{ConfigWarning, ProjectConfig};
use crate::logging::LogSink;
use crate::ui::{TerminalPrompt, UiContext};

pub struct CommandContext {
    pub invocation: Invocation,
    pub cancel: CancelToken,
    pub log: LogSink,
    pub cwd: PathBuf,
    pub ui: UiContext,
    project: Option<Project>,
}

impl CommandContext {
    pub fn new(
        invocation: Invocation,
        cancel: CancelToken,
        log: LogSink,
        cwd: PathBuf,
        ui: UiContext,
    ) -> Self {
        Self {
            invocation,
            cancel,
            log,
            cwd,
            ui,
            project: None,
        }
    }

    /// Explicit `--stage`, if given
    pub fn stage_flag(&self) -> Option<&str> {
        self.invocation.string("stage")
    }

    /// The project and stage this invocation targets.
    ///
    /// Loaded on first use: finds `stagehand.toml`, resolves the stage (which
    /// may prompt), and moves the log into the project directory.
    pub fn project(&mut self) -> anyhow::Result<&Project> {
        if self.project.is_none() {
            let project = self.open_project()?;
            self.project = Some(project);
        }
        self.project
            .as_ref()
            .context("project was not initialized")
    }

    fn open_project(&self) -> anyhow::Result<Project> {
        let config = ProjectConfig::discover(&self.cwd)?;
        match self.log.relocate(&config.root) {
            Ok(true) => debug!(path = %self.log.path().display(), "log relocated"),
            Ok(false) => {}
            Err(err) => tracing::warn!(error = %err, "could not move log into project"),
        }
        print_warnings(&config.warnings);

        let stage = StageResolver::new(&config.root, TerminalPrompt::new(self.ui))
            .resolve(self.stage_flag())?;
        let project = Project::open(config, &stage)?;
        info!(key = %project.key, command = %self.invocation.command_name(), "project opened");
        Ok(project)
    }
}

fn print_warnings(warnings: &[ConfigWarning]) {
    let stderr = io::stderr();
    let mut out = stderr.lock();
    for warning in warnings {
        let mut line = format!(
            "warning: unknown key '{}' in {}",
            warning.key,
            warning.file.display()
        );
        if let Some(n) = warning.line {
            line.push_str(&format!(":{}", n));
        }
        if let Some(suggestion) = &warning.suggestion {
            line.push_str(&format!(" (did you mean '{}'?)", suggestion));
        }
        let _ = writeln!(out, "{}", line);
    }
}
