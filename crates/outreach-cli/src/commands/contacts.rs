//! Single-target commands: check, block, unblock, reset.

use anyhow::{Result, bail};
use outreach_core::normalize;

use super::Ctx;
use crate::render;

pub(crate) fn check(ctx: &Ctx, url: &str) -> Result<()> {
    let store = ctx.open_store()?;
    let check = store.check(url);

    println!("key        {}", normalize(url));
    println!("status     {}", check.status);
    println!("can send   {}", if check.can_send { "yes" } else { "no" });
    if let Some(remaining) = check.cooldown_remaining {
        println!("remaining  {}", render::days(remaining));
    }
    if let Some(record) = &check.record {
        println!("last sent  {}", render::timestamp(record.last_sent_at));
        println!("success    {}", record.success);
        if let Some(reason) = &record.block_reason {
            println!("reason     {reason}");
        }
        if !record.metadata.is_empty() {
            println!("metadata   {}", serde_json::to_string(&record.metadata)?);
        }
    }
    Ok(())
}

pub(crate) fn block(ctx: &Ctx, url: &str, reason: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    store.block(url, reason)?;
    store.close()?;
    println!("blocked {} ({reason})", normalize(url));
    Ok(())
}

pub(crate) fn unblock(ctx: &Ctx, url: &str) -> Result<()> {
    let mut store = ctx.open_store()?;
    let changed = store.unblock(url)?;
    let status = store.check(url).status;
    store.close()?;
    if changed {
        println!("unblocked {} (now {status})", normalize(url));
    } else {
        println!("{} has no record", normalize(url));
    }
    Ok(())
}

pub(crate) fn reset(ctx: &Ctx, target: &str, force: bool) -> Result<()> {
    if !force {
        bail!("reset cannot be undone; pass --force to confirm");
    }
    let mut store = ctx.open_store()?;
    match target {
        "all" => {
            let removed = store.reset_all()?;
            println!("reset {removed} record(s)");
        }
        "cooldown" => {
            let removed = store.reset_cooldowns()?;
            println!("reset {removed} record(s) in cooldown");
        }
        url => {
            let existed = store.reset(url)?;
            let key = normalize(url);
            if existed {
                println!("reset {key}");
            } else {
                println!("{key} had no record");
            }
        }
    }
    store.close()?;
    Ok(())
}
