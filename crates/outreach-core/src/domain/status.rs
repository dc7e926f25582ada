//! Eligibility views computed from the contact store.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::record::ContactRecord;

/// Eligibility of a single target.
///
/// Decision order (first match wins):
/// - no record -> New
/// - blocked -> Blocked
/// - inside the cooldown window -> Cooldown
/// - otherwise -> Available
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    Available,
    Cooldown,
    Blocked,
}

impl ContactStatus {
    pub fn can_send(self) -> bool {
        matches!(self, ContactStatus::New | ContactStatus::Available)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Available => "available",
            ContactStatus::Cooldown => "cooldown",
            ContactStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of `ContactStore::check`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub status: ContactStatus,
    pub can_send: bool,
    /// Only set for [`ContactStatus::Cooldown`], always > 0 there.
    pub cooldown_remaining: Option<Duration>,
    pub record: Option<ContactRecord>,
}

impl CheckResult {
    pub(crate) fn new_contact() -> Self {
        Self {
            status: ContactStatus::New,
            can_send: true,
            cooldown_remaining: None,
            record: None,
        }
    }

    pub(crate) fn from_record(record: &ContactRecord, now: f64, window: Duration) -> Self {
        let (status, cooldown_remaining) = if record.blocked {
            (ContactStatus::Blocked, None)
        } else {
            match record.cooldown_remaining(now, window) {
                Some(remaining) => (ContactStatus::Cooldown, Some(remaining)),
                None => (ContactStatus::Available, None),
            }
        };
        Self {
            status,
            can_send: status.can_send(),
            cooldown_remaining,
            record: Some(record.clone()),
        }
    }
}

/// Aggregate counts over every stored record, computed at call time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_contacts: usize,
    pub blocked: usize,
    pub in_cooldown: usize,
    pub available: usize,
    pub storage_size_bytes: u64,
}
