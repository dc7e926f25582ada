//! Command handlers. Each one is thin: load what it needs, call the core,
//! print the result.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use outreach_core::ContactStore;
use outreach_core::config::OutreachConfig;

use crate::Commands;

mod contacts;
mod history;
mod init;
mod send;
mod status;

pub(crate) struct Ctx {
    pub config_path: PathBuf,
    pub config: OutreachConfig,
}

impl Ctx {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config = OutreachConfig::load_or_init(config_path)
            .with_context(|| format!("failed to load config {}", config_path.display()))?;
        Ok(Self {
            config_path: config_path.to_path_buf(),
            config,
        })
    }

    pub fn open_store(&self) -> Result<ContactStore> {
        ContactStore::open(&self.config.store_dir, self.config.safety.cooldown()).with_context(
            || {
                format!(
                    "failed to open contact store in {}",
                    self.config.store_dir.display()
                )
            },
        )
    }
}

pub(crate) fn run(ctx: &Ctx, command: Commands) -> Result<()> {
    match command {
        Commands::Init => init::handle(ctx),
        Commands::Send(args) => send::handle(ctx, &args),
        Commands::Status { urls } => status::handle(ctx, urls.as_deref()),
        Commands::Check { url } => contacts::check(ctx, &url),
        Commands::Block { url, reason } => contacts::block(ctx, &url, &reason),
        Commands::Unblock { url } => contacts::unblock(ctx, &url),
        Commands::Reset { target, force } => contacts::reset(ctx, &target, force),
        Commands::Export { output } => history::export(ctx, &output),
        Commands::Import { file } => history::import(ctx, &file),
    }
}

/// `path` as given if it exists, otherwise `dir/path`.
pub(crate) fn resolve_input(path: &Path, dir: &Path) -> PathBuf {
    if path.exists() || path.is_absolute() {
        return path.to_path_buf();
    }
    let candidate = dir.join(path);
    if candidate.exists() {
        candidate
    } else {
        path.to_path_buf()
    }
}
