//! Configuration (`config.toml`) and environment overrides.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::ConfigError;
use crate::store::persist_atomic;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachConfig {
    pub safety: SafetyConfig,
    pub retry: RetryConfig,
    pub delay: DelayConfig,
    pub action: ActionConfig,

    pub store_dir: PathBuf,
    pub log_dir: PathBuf,
    pub message_dir: PathBuf,
    pub urls_dir: PathBuf,

    /// Applied to every message template before sending.
    pub template_variables: BTreeMap<String, String>,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            safety: SafetyConfig::default(),
            retry: RetryConfig::default(),
            delay: DelayConfig::default(),
            action: ActionConfig::default(),
            store_dir: PathBuf::from("./cache"),
            log_dir: PathBuf::from("./logs"),
            message_dir: PathBuf::from("./message"),
            urls_dir: PathBuf::from("./urls"),
            template_variables: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyConfig {
    pub cooldown_days: u32,
    pub max_daily: u32,
    pub auto_stop_on_limit: bool,
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            cooldown_days: 28,
            max_daily: 50,
            auto_stop_on_limit: true,
        }
    }
}

impl SafetyConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(u64::from(self.cooldown_days) * SECS_PER_DAY)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// Backoff schedule in seconds; the last entry repeats.
    pub delays: Vec<u64>,
    pub jitter_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delays: vec![3, 7, 15],
            jitter_secs: 2.0,
        }
    }
}

/// Pause between consecutive targets of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayConfig {
    pub min_seconds: f64,
    pub max_seconds: f64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            min_seconds: 3.0,
            max_seconds: 8.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Program and leading arguments. URL and message are appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: 30,
        }
    }
}

impl OutreachConfig {
    /// Load `path`, writing defaults there first if it does not exist, then
    /// apply `OUTREACH_*` environment overrides.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::load(path)?
        } else {
            let config = Self::default();
            config.write(path)?;
            config
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let write_error = |reason: String| ConfigError::Write {
            path: path.to_path_buf(),
            reason,
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| write_error(e.to_string()))?;
        }
        let contents = toml::to_string_pretty(self).map_err(|e| write_error(e.to_string()))?;
        persist_atomic(path, contents.as_bytes()).map_err(|e| write_error(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts(self.retry.max_attempts));
        }
        if self.retry.delays.is_empty() {
            return Err(ConfigError::EmptyBackoffSchedule);
        }
        for (field, value) in [
            ("retry.jitter_secs", self.retry.jitter_secs),
            ("delay.min_seconds", self.delay.min_seconds),
            ("delay.max_seconds", self.delay.max_seconds),
        ] {
            if Duration::try_from_secs_f64(value.max(0.0)).is_err() {
                return Err(ConfigError::InvalidSeconds { field, value });
            }
        }
        if self.delay.min_seconds > self.delay.max_seconds {
            return Err(ConfigError::InvalidDelayRange {
                min: self.delay.min_seconds,
                max: self.delay.max_seconds,
            });
        }
        Ok(())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from any variable source. Unparseable values are
    /// skipped with a warning.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(days) = parse_var(&lookup, "OUTREACH_COOLDOWN_DAYS") {
            self.safety.cooldown_days = days;
        }
        if let Some(max) = parse_var(&lookup, "OUTREACH_MAX_DAILY") {
            self.safety.max_daily = max;
        }
        if let Some(timeout) = parse_var(&lookup, "OUTREACH_ACTION_TIMEOUT") {
            self.action.timeout_secs = timeout;
        }
        if let Some(dir) = lookup("OUTREACH_STORE_DIR").filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("OUTREACH_LOG_DIR").filter(|v| !v.is_empty()) {
            self.log_dir = PathBuf::from(dir);
        }
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparseable environment override");
            None
        }
    }
}
