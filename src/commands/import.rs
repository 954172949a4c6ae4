use anyhow::{Context, Result};

use crate::domain::entities::ImportSpec;
use crate::presentation::context::CommandContext;

pub fn cmd_import(ctx: &mut CommandContext) -> Result<()> {
    let spec = ImportSpec::new(
        ctx.invocation.positional(0),
        ctx.invocation.positional(1),
        ctx.invocation.positional(2),
    )
    .with_parent(ctx.invocation.string("parent").map(str::to_string));

    let project = ctx.project()?;
    let mut stack = project.stack();
    stack
        .import(&spec)
        .with_context(|| format!("failed to import {} {}", spec.resource_type, spec.name))?;
    println!(
        "Imported {} {} ({}) into {}",
        spec.resource_type, spec.name, spec.id, project.key
    );
    Ok(())
}
