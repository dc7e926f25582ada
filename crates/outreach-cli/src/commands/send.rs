use std::fs;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use outreach_core::app::{BatchEvent, BatchOptions, BatchReport, BatchRunner};
use outreach_core::dispatch::DispatcherBuilder;
use outreach_core::template;
use outreach_core::{ActionError, RawActionResult};
use serde_json::json;
use tracing::info;

use super::{Ctx, resolve_input};
use crate::SendArgs;
use crate::command_action::CommandAction;
use crate::render;

pub(crate) fn handle(ctx: &Ctx, args: &SendArgs) -> Result<()> {
    let config = &ctx.config;
    let message_path = resolve_input(&args.message, &config.message_dir);
    let urls_path = resolve_input(&args.urls, &config.urls_dir);

    let body = template::read_template(&message_path)
        .with_context(|| format!("failed to read template {}", message_path.display()))?;
    let targets = template::read_targets(&urls_path)
        .with_context(|| format!("failed to read URL list {}", urls_path.display()))?;
    if targets.is_empty() {
        bail!("{} lists no URLs", urls_path.display());
    }

    let template_name = message_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| message_path.display().to_string());
    let planned = args.max.map_or(targets.len(), |max| targets.len().min(max));

    println!("template  {template_name} ({} chars)", body.chars().count());
    println!("targets   {planned}");
    println!(
        "mode      {}",
        if args.dry_run { "dry run" } else { "live" }
    );
    if args.force {
        println!("          cooldowns and blocks ignored (--force)");
    }

    let mut action = if args.dry_run {
        None
    } else {
        let action = CommandAction::from_config(&config.action)?;
        if !args.yes && !confirm("Start sending?")? {
            println!("aborted");
            return Ok(());
        }
        Some(action)
    };

    let mut store = ctx.open_store()?;
    let mut dispatcher = DispatcherBuilder::from_config(&config.retry)
        .build()
        .context("invalid [retry] config")?;
    let options = BatchOptions {
        dry_run: args.dry_run,
        force: args.force,
        max_targets: args.max,
        ..BatchOptions::from_config(config)
    };

    let mut on_event = |event: BatchEvent<'_>| match event {
        BatchEvent::Dispatching { index, total, url } => {
            println!("send    [{}/{}] {}", index + 1, total, render::short_url(url));
        }
        BatchEvent::Retrying { attempt, .. } => {
            println!("        retry #{attempt}");
        }
        BatchEvent::Pausing { delay } => {
            info!(delay_secs = delay.as_secs_f64(), "pausing before next target");
        }
        BatchEvent::Finished { index, total, entry } => {
            println!("{}", render::entry_line(index, total, entry));
        }
        BatchEvent::Halted { .. } => {}
    };

    let mut runner = BatchRunner::new(&mut store, &mut dispatcher, options)
        .variables(config.template_variables.clone());
    let report = match action.as_mut() {
        Some(action) => runner.run(&targets, &template_name, &body, action, &mut on_event),
        None => {
            let mut no_action = |_: &str, _: &str| -> Result<RawActionResult, ActionError> {
                Err(ActionError::Transient("dry run".to_string()))
            };
            runner.run(&targets, &template_name, &body, &mut no_action, &mut on_event)
        }
    }
    .context("contact store write failed; stopping")?;
    store.close().context("failed to close contact store")?;

    println!();
    print!("{}", render::report(&report));

    let log_path = write_run_log(ctx, &report, &message_path, &urls_path)?;
    println!("\nrun log   {}", log_path.display());
    Ok(())
}

fn write_run_log(
    ctx: &Ctx,
    report: &BatchReport,
    message_path: &std::path::Path,
    urls_path: &std::path::Path,
) -> Result<std::path::PathBuf> {
    let dir = &ctx.config.log_dir;
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(format!("run_{}.json", report.run_id.as_ulid()));
    let log = json!({
        "report": report,
        "config": ctx.config,
        "files": {
            "config": ctx.config_path,
            "message": message_path,
            "urls": urls_path,
        },
    });
    let contents = serde_json::to_string_pretty(&log)?;
    fs::write(&path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
