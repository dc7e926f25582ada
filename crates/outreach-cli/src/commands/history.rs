use std::path::Path;

use anyhow::{Context, Result};

use super::Ctx;

pub(crate) fn export(ctx: &Ctx, output: &Path) -> Result<()> {
    let store = ctx.open_store()?;
    let count = store
        .export_history(output)
        .with_context(|| format!("failed to export to {}", output.display()))?;
    println!("exported {count} record(s) to {}", output.display());
    Ok(())
}

pub(crate) fn import(ctx: &Ctx, file: &Path) -> Result<()> {
    let mut store = ctx.open_store()?;
    let count = store
        .import_history(file)
        .with_context(|| format!("failed to import {}", file.display()))?;
    store.close()?;
    println!("imported {count} record(s) from {}", file.display());
    Ok(())
}
