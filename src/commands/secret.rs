use anyhow::{Context, Result};

use crate::application::secrets::{list_secrets, remove_secret, set_secret};
use crate::presentation::context::CommandContext;

pub fn cmd_secret_set(ctx: &mut CommandContext) -> Result<()> {
    let name = ctx.invocation.positional(0).to_string();
    let value = ctx.invocation.positional(1).to_string();
    let project = ctx.project()?;
    set_secret(project.backend.as_ref(), &project.key, &name, &value)
        .with_context(|| format!("failed to set secret {}", name))?;
    println!("Set {} for {}", name, project.key);
    Ok(())
}

pub fn cmd_secret_remove(ctx: &mut CommandContext) -> Result<()> {
    let name = ctx.invocation.positional(0).to_string();
    let project = ctx.project()?;
    remove_secret(project.backend.as_ref(), &project.key, &name)
        .with_context(|| format!("failed to remove secret {}", name))?;
    println!("Removed {} from {}", name, project.key);
    Ok(())
}

pub fn cmd_secret_list(ctx: &mut CommandContext) -> Result<()> {
    let project = ctx.project()?;
    let secrets = list_secrets(project.backend.as_ref(), &project.key)
        .context("failed to list secrets")?;
    if secrets.is_empty() {
        eprintln!("No secrets set for {}", project.key);
    }
    for (name, value) in &secrets {
        println!("{} = {}", name, value);
    }
    Ok(())
}
