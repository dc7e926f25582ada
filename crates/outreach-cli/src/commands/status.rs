use std::path::Path;

use anyhow::{Context, Result};
use outreach_core::template;

use super::{Ctx, resolve_input};
use crate::render;

pub(crate) fn handle(ctx: &Ctx, urls: Option<&Path>) -> Result<()> {
    let store = ctx.open_store()?;
    print!("{}", render::stats(&store.stats()));
    println!("cooldown window:  {}", render::days(store.cooldown()));

    let Some(urls) = urls else {
        return Ok(());
    };
    let path = resolve_input(urls, &ctx.config.urls_dir);
    let targets = template::read_targets(&path)
        .with_context(|| format!("failed to read URL list {}", path.display()))?;

    println!();
    println!("{:<50}  {:<10} {:>9}", "url", "status", "remaining");
    for url in &targets {
        let check = store.check(url);
        let remaining = check
            .cooldown_remaining
            .map(render::days)
            .unwrap_or_default();
        println!(
            "{:<50}  {:<10} {:>9}",
            render::short_url(url),
            check.status,
            remaining
        );
    }
    Ok(())
}
