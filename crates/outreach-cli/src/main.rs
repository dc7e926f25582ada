//! `outreach`: batch outreach with cooldowns, blocks and retries.

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use outreach_core::observability::{self, TelemetryConfig};

mod command_action;
mod commands;
mod render;

#[derive(Parser, Debug)]
#[command(
    name = "outreach",
    version,
    about = "Rate-limited outreach over a list of profile URLs",
    arg_required_else_help = true
)]
pub struct Cli {
    /// More log output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Config file; created with defaults if missing.
    #[arg(short = 'c', long, global = true, value_name = "PATH", default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the working directories, default config and sample files.
    Init,

    /// Send a message template to every URL in a list.
    Send(SendArgs),

    /// Show store statistics, optionally per URL.
    Status {
        /// URL list to check one by one.
        #[arg(short = 'u', long, value_name = "FILE")]
        urls: Option<PathBuf>,
    },

    /// Show the status of one URL.
    Check { url: String },

    /// Never contact this URL again.
    Block {
        url: String,
        #[arg(short = 'r', long, default_value = "manual")]
        reason: String,
    },

    /// Lift a block. Cooldown from the last send still applies.
    Unblock { url: String },

    /// Forget state: `all`, `cooldown`, or a single URL.
    Reset {
        target: String,
        /// Required; the reset cannot be undone.
        #[arg(long)]
        force: bool,
    },

    /// Write every record to a JSON file.
    Export {
        #[arg(short = 'o', long, default_value = "history.json")]
        output: PathBuf,
    },

    /// Merge records from a JSON history file.
    Import { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Message template file (looked up in `message_dir` if not found).
    pub message: PathBuf,

    /// URL list file (looked up in `urls_dir` if not found).
    pub urls: PathBuf,

    /// Only report what would be sent.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Process at most this many URLs.
    #[arg(short = 'm', long, value_name = "N")]
    pub max: Option<usize>,

    /// Ignore cooldowns and blocks.
    #[arg(long)]
    pub force: bool,

    /// Do not ask for confirmation.
    #[arg(short = 'y', long)]
    pub yes: bool,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let ctx = commands::Ctx::load(&cli.config)?;
    let _telemetry = observability::init(
        TelemetryConfig::new(cli.verbose).with_log_dir(ctx.config.log_dir.clone()),
    );

    commands::run(&ctx, cli.command)
}
