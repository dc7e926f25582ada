//! Contact record: what we know about one target.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::key::ContactKey;

/// Caller-attached annotations (campaign id, template name, run id, ...).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// One record per [`ContactKey`].
///
/// Design:
/// - Blocking and cooldown are tracked independently; `blocked` always wins.
/// - `last_sent_at` only moves forward, except through a full reset.
/// - `block_reason` is present iff `blocked`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRecord {
    /// Identity. Stored as the map key on disk, restored on load.
    #[serde(skip)]
    pub key: ContactKey,

    /// Seconds since the Unix epoch of the most recent recorded send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<f64>,

    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

impl ContactRecord {
    pub fn new(key: ContactKey) -> Self {
        Self {
            key,
            last_sent_at: None,
            success: false,
            blocked: false,
            block_reason: None,
            metadata: Metadata::new(),
        }
    }

    /// Record a send at `now` (epoch seconds).
    ///
    /// Metadata is merged: new entries overwrite entries with the same name,
    /// older entries survive.
    pub fn record_send(&mut self, now: f64, success: bool, metadata: Metadata) {
        self.last_sent_at = Some(match self.last_sent_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
        self.success = success;
        self.metadata.extend(metadata);
    }

    pub fn block(&mut self, reason: impl Into<String>) {
        self.blocked = true;
        self.block_reason = Some(reason.into());
    }

    pub fn unblock(&mut self) {
        self.blocked = false;
        self.block_reason = None;
    }

    /// Time left before this record leaves cooldown, ignoring `blocked`.
    ///
    /// `None` when the record was never sent or the window has elapsed.
    pub fn cooldown_remaining(&self, now: f64, window: Duration) -> Option<Duration> {
        let last = self.last_sent_at?;
        let elapsed = now - last;
        let window = window.as_secs_f64();
        if elapsed < window {
            // A far-future `last_sent_at` leaves more than `Duration` can hold.
            Some(Duration::try_from_secs_f64(window - elapsed).unwrap_or(Duration::MAX))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(86_400);

    fn record() -> ContactRecord {
        ContactRecord::new(ContactKey::new("https://x.com/in/a"))
    }

    #[test]
    fn never_sent_has_no_cooldown() {
        assert_eq!(record().cooldown_remaining(1_000.0, DAY), None);
    }

    #[test]
    fn cooldown_counts_down_then_clears() {
        let mut r = record();
        r.record_send(1_000.0, true, Metadata::new());

        let remaining = r.cooldown_remaining(1_000.0 + 3_600.0, DAY).unwrap();
        assert_eq!(remaining, Duration::from_secs(86_400 - 3_600));

        assert_eq!(r.cooldown_remaining(1_000.0 + 86_400.0, DAY), None);
    }

    #[test]
    fn far_future_send_saturates_remaining_time() {
        let mut r = record();
        r.last_sent_at = Some(1e20);
        assert_eq!(r.cooldown_remaining(1_000.0, DAY), Some(Duration::MAX));
    }

    #[test]
    fn last_sent_never_moves_backwards() {
        let mut r = record();
        r.record_send(2_000.0, true, Metadata::new());
        r.record_send(1_500.0, false, Metadata::new());
        assert_eq!(r.last_sent_at, Some(2_000.0));
        assert!(!r.success);
    }

    #[test]
    fn metadata_merges_and_overwrites() {
        let mut r = record();
        let mut first = Metadata::new();
        first.insert("campaign".into(), "q4".into());
        first.insert("template".into(), "intro_v1".into());
        r.record_send(1.0, true, first);

        let mut second = Metadata::new();
        second.insert("template".into(), "intro_v2".into());
        r.record_send(2.0, true, second);

        assert_eq!(r.metadata["campaign"], "q4");
        assert_eq!(r.metadata["template"], "intro_v2");
    }

    #[test]
    fn block_reason_follows_blocked_flag() {
        let mut r = record();
        r.block("declined");
        assert!(r.blocked);
        assert_eq!(r.block_reason.as_deref(), Some("declined"));

        r.unblock();
        assert!(!r.blocked);
        assert_eq!(r.block_reason, None);
    }
}
