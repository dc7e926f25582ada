//! Flattened history entries used by export / import.

use serde::{Deserialize, Serialize};

use super::key::ContactKey;
use super::record::{ContactRecord, Metadata};

/// Reason recorded when an imported entry is blocked but carries none.
const IMPORTED_BLOCK_REASON: &str = "imported";

/// One exported record, key included.
///
/// Import is lenient about field names so that hand-kept batch logs
/// (`key` instead of `url`, `last_sent_at` instead of `timestamp`) load too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<f64>,

    #[serde(default = "default_success")]
    pub success: bool,

    #[serde(default)]
    pub blocked: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

fn default_success() -> bool {
    true
}

impl From<&ContactRecord> for HistoryEntry {
    fn from(record: &ContactRecord) -> Self {
        Self {
            url: Some(record.key.to_string()),
            key: None,
            timestamp: record.last_sent_at,
            last_sent_at: None,
            success: record.success,
            blocked: record.blocked,
            reason: record.block_reason.clone(),
            block_reason: None,
            metadata: record.metadata.clone(),
        }
    }
}

impl HistoryEntry {
    /// Build the record this entry describes. `None` if it names no target.
    ///
    /// `url`, `timestamp` and `reason` win over their batch-log spellings
    /// when an entry carries both.
    pub fn into_record(self) -> Option<ContactRecord> {
        let url = [self.url, self.key]
            .into_iter()
            .flatten()
            .find(|u| !u.trim().is_empty())?;
        let mut record = ContactRecord::new(ContactKey::new(&url));
        record.last_sent_at = self.timestamp.or(self.last_sent_at);
        record.success = self.success;
        record.metadata = self.metadata;
        if self.blocked {
            record.block(
                self.reason
                    .or(self.block_reason)
                    .unwrap_or_else(|| IMPORTED_BLOCK_REASON.to_string()),
            );
        }
        Some(record)
    }
}
