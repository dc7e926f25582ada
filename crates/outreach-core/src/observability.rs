//! Logging setup for binaries.
//!
//! Library code only emits `tracing` events; installing a subscriber is the
//! caller's job. Tests use `tracing::subscriber::with_default` instead.

use std::fs;
use std::path::PathBuf;

use tracing::metadata::LevelFilter;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Env var holding an `EnvFilter` directive, e.g. `OUTREACH_LOG=outreach_core=debug`.
pub const LOG_ENV_VAR: &str = "OUTREACH_LOG";

const LOG_FILE_PREFIX: &str = "outreach.log";

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    /// Number of `-v` flags.
    pub verbosity: u8,
    /// Daily-rolling log files go here when set.
    pub log_dir: Option<PathBuf>,
}

impl TelemetryConfig {
    pub fn new(verbosity: u8) -> Self {
        Self {
            verbosity,
            log_dir: None,
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }
}

/// Keeps the file writer alive. Dropping it flushes pending lines.
#[must_use = "dropping the guard stops the file writer"]
pub struct TelemetryGuard {
    _file: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install the global subscriber. A second call leaves the first in place.
pub fn init(config: TelemetryConfig) -> TelemetryGuard {
    let filter = EnvFilter::builder()
        .with_default_directive(level_from_verbosity(config.verbosity).into())
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy();

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![Box::new(
        tracing_subscriber::fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(config.verbosity > 1),
    )];

    let mut file_guard = None;
    let mut setup_error = None;
    if let Some(dir) = &config.log_dir {
        match fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                layers.push(Box::new(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                ));
                file_guard = Some(guard);
            }
            Err(err) => {
                setup_error = Some(format!("log dir init failed for {}: {err}", dir.display()));
            }
        }
    }

    layers.push(Box::new(filter));

    if Registry::default().with(layers).try_init().is_err() {
        tracing::debug!("global subscriber already installed");
    }
    if let Some(error) = setup_error {
        tracing::warn!("{error}");
    }

    TelemetryGuard { _file: file_guard }
}

fn level_from_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, LevelFilter::WARN)]
    #[case(1, LevelFilter::INFO)]
    #[case(2, LevelFilter::DEBUG)]
    #[case(9, LevelFilter::DEBUG)]
    fn verbosity_maps_to_level(#[case] verbosity: u8, #[case] level: LevelFilter) {
        assert_eq!(level_from_verbosity(verbosity), level);
    }

    #[test]
    fn config_builder_sets_log_dir() {
        let config = TelemetryConfig::new(1).with_log_dir("logs");
        assert_eq!(config.verbosity, 1);
        assert_eq!(config.log_dir, Some(PathBuf::from("logs")));
    }
}
