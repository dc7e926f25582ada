//! Outcome model: the closed result of one logical dispatch.
//!
//! However the external action answered (structured, legacy, raised error),
//! the caller only ever sees a [`DispatchOutcome`]. Failures of the action are
//! data here, not error flow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unified classification of a dispatch result.
///
/// Success family: `Success`, `Pending`, `AlreadyConnected`.
/// Everything else is a failure from the session's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Success,
    Pending,
    AlreadyConnected,
    /// The external side is rate limiting or restricting us. Callers should
    /// stop the whole batch, not just this target.
    Blocked,
    Timeout,
    Failed,
    RetriesExhausted,
}

impl OutcomeKind {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            OutcomeKind::Success | OutcomeKind::Pending | OutcomeKind::AlreadyConnected
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::Pending => "pending",
            OutcomeKind::AlreadyConnected => "already_connected",
            OutcomeKind::Blocked => "blocked",
            OutcomeKind::Timeout => "timeout",
            OutcomeKind::Failed => "failed",
            OutcomeKind::RetriesExhausted => "retries_exhausted",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one `Dispatcher::send` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub kind: OutcomeKind,
    pub url: String,
    pub timestamp: DateTime<Utc>,

    /// Always >= 1.
    pub attempts_made: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Informational status string from the action, if it gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_status: Option<String>,
}

impl DispatchOutcome {
    pub fn new(
        kind: OutcomeKind,
        url: impl Into<String>,
        timestamp: DateTime<Utc>,
        attempts_made: u32,
    ) -> Self {
        Self {
            kind,
            url: url.into(),
            timestamp,
            attempts_made: attempts_made.max(1),
            error_message: None,
            detail_status: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_detail_status(mut self, status: Option<String>) -> Self {
        self.detail_status = status;
        self
    }

    pub fn is_success(&self) -> bool {
        self.kind.is_success()
    }
}

/// Per-dispatcher counters. Not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub sent: u64,
    pub failed: u64,
    pub retried: u64,
}

impl SessionStats {
    pub(crate) fn record(&mut self, kind: OutcomeKind) {
        if kind.is_success() {
            self.sent += 1;
        } else {
            self.failed += 1;
        }
    }
}
