use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

use super::CommandError;
use crate::application::shell::{resource_env, shell_prompt, DEFAULT_SHELL};
use crate::domain::ports::LinkMap;
use crate::domain::value_objects::StageKey;
use crate::presentation::context::CommandContext;

pub fn cmd_shell(ctx: &mut CommandContext) -> Result<()> {
    let args = ctx.invocation.positionals.clone();
    let project = ctx.project()?;
    let links = project
        .backend
        .get_links(&project.key)
        .context("failed to load linked resources")?;

    let mut command = resource_command(&args, &links, &project.key, project.root());
    let program = program_name(&args);
    let status = command.status().map_err(|source| CommandError::Spawn {
        program: program.clone(),
        source,
    })?;
    debug!(%program, %status, "shell command exited");
    if !status.success() {
        return Err(CommandError::ChildFailed { program, status }.into());
    }
    Ok(())
}

/// `args` (or the default shell) with every linked resource exported
pub(crate) fn resource_command(
    args: &[String],
    links: &LinkMap,
    key: &StageKey,
    cwd: &Path,
) -> Command {
    let mut command = match args.split_first() {
        Some((program, rest)) => {
            let mut command = Command::new(program);
            command.args(rest);
            command
        }
        None => Command::new(DEFAULT_SHELL),
    };
    command
        .current_dir(cwd)
        .envs(resource_env(links))
        .env("PS1", shell_prompt(key));
    command
}

pub(crate) fn program_name(args: &[String]) -> String {
    args.first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}
