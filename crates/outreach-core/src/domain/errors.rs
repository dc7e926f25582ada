//! Errors - エラー型と分類
//!
//! - `StoreError`: 永続化の失敗（I/O, 破損ファイル, 読めない履歴ファイル）。呼び出し元に必ず返す
//! - `ConfigError`: 設定値の不正。構築時に即失敗させる
//!
//! 外部アクションの失敗は `ActionError` (domain::action) で、エラーではなく
//! `DispatchOutcome` のデータとして扱う。

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("history file {path} is not a list of entries: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("max_attempts must be at least 1 (got {0})")]
    InvalidMaxAttempts(u32),

    #[error("backoff schedule must contain at least one delay")]
    EmptyBackoffSchedule,

    #[error("delay range is inverted: min {min}s > max {max}s")]
    InvalidDelayRange { min: f64, max: f64 },

    #[error("{field} must be a finite number of seconds (got {value})")]
    InvalidSeconds { field: &'static str, value: f64 },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write config {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}
