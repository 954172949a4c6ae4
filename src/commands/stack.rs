use anyhow::{Context, Result};
use tracing::info;

use crate::application::events::{event_channel, DEFAULT_CAPACITY};
use crate::domain::entities::StackCommand;
use crate::presentation::context::CommandContext;
use crate::ui::progress::{spawn_renderer, summarize};

pub fn cmd_deploy(ctx: &mut CommandContext) -> Result<()> {
    run_stack_command(ctx, StackCommand::Up)
}

pub fn cmd_remove(ctx: &mut CommandContext) -> Result<()> {
    run_stack_command(ctx, StackCommand::Destroy)
}

pub fn cmd_refresh(ctx: &mut CommandContext) -> Result<()> {
    run_stack_command(ctx, StackCommand::Refresh)
}

fn run_stack_command(ctx: &mut CommandContext, command: StackCommand) -> Result<()> {
    let ui = ctx.ui;
    let cancel = ctx.cancel.clone();
    let project = ctx.project()?;
    let mut stack = project.stack();

    let (publisher, hub) = event_channel(DEFAULT_CAPACITY);
    let renderer = spawn_renderer(project.key.clone(), hub.subscribe(), ui);
    let result = stack.run(command, publisher, &cancel);
    let _ = renderer.join();

    let outcome = result.with_context(|| format!("{} failed for {}", command, project.key))?;
    info!(key = %project.key, %command, summary = %summarize(&outcome.summary), "run finished");
    Ok(())
}

pub fn cmd_unlock(ctx: &mut CommandContext) -> Result<()> {
    let project = ctx.project()?;
    let mut stack = project.stack();
    let cleared = stack
        .cancel()
        .with_context(|| format!("failed to unlock {}", project.key))?;
    match cleared {
        Some(record) => info!(key = %project.key, holder = %record.holder, "lock cleared"),
        None => info!(key = %project.key, "no lock was held"),
    }
    println!("Unlocked the app state for: {}", project.key);
    Ok(())
}
