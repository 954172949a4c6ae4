use anyhow::{Context, Result};

use crate::presentation::context::CommandContext;
use crate::presentation::tree;

pub fn cmd_version(_ctx: &mut CommandContext) -> Result<()> {
    println!("stagehand {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

pub fn cmd_introspect(_ctx: &mut CommandContext) -> Result<()> {
    let json = serde_json::to_string_pretty(&tree::root()).context("failed to encode command tree")?;
    println!("{}", json);
    Ok(())
}
