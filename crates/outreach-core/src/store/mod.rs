//! Contact store: durable "can we contact this target now?" state.
//!
//! Design:
//! - The in-memory map is the single source of truth while the store is open.
//! - Every mutation is flushed to disk before the call returns (atomic replace).
//!   A failed flush rolls the mutation back, so memory never runs ahead of disk.
//! - One open store per directory. Nothing stops a second process from
//!   opening the same directory; doing so is unsupported.

mod persist;

pub(crate) use persist::write_atomic as persist_atomic;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::{
    CheckResult, ContactKey, ContactRecord, ContactStatus, HistoryEntry, Metadata, StoreError,
    StoreStats,
};
use crate::ports::{Clock, SystemClock};

/// File name of the store inside its directory.
pub const STORE_FILE: &str = "contacts.json";

pub struct ContactStore {
    path: PathBuf,
    cooldown: Duration,
    records: BTreeMap<ContactKey, ContactRecord>,
    clock: Arc<dyn Clock>,
}

impl ContactStore {
    /// Open (or create) the store in `dir`, using the system clock.
    pub fn open(dir: impl AsRef<Path>, cooldown: Duration) -> Result<Self, StoreError> {
        Self::open_with_clock(dir, cooldown, Arc::new(SystemClock))
    }

    pub fn open_with_clock(
        dir: impl AsRef<Path>,
        cooldown: Duration,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))?;

        let path = dir.join(STORE_FILE);
        let records = persist::load(&path)?;
        info!(
            path = %path.display(),
            contacts = records.len(),
            cooldown_secs = cooldown.as_secs(),
            "contact store opened"
        );

        Ok(Self {
            path,
            cooldown,
            records,
            clock,
        })
    }

    /// Scoped acquisition: open, run `f`, close on every exit path.
    ///
    /// An error from `f` wins over a close error.
    pub fn with_open<T, E>(
        dir: impl AsRef<Path>,
        cooldown: Duration,
        f: impl FnOnce(&mut ContactStore) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut store = Self::open(dir, cooldown)?;
        let result = f(&mut store);
        let closed = store.close();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Change the window. Affects `check` and `stats` immediately, records
    /// are not rewritten.
    pub fn set_cooldown(&mut self, cooldown: Duration) {
        self.cooldown = cooldown;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ContactKey> {
        self.records.keys()
    }

    pub fn get(&self, raw: &str) -> Option<&ContactRecord> {
        self.records.get(&ContactKey::new(raw))
    }

    pub fn check(&self, raw: &str) -> CheckResult {
        let key = ContactKey::new(raw);
        match self.records.get(&key) {
            None => CheckResult::new_contact(),
            Some(record) => {
                CheckResult::from_record(record, self.clock.epoch_secs(), self.cooldown)
            }
        }
    }

    /// Record a send. Creates the record if needed.
    pub fn mark_sent(
        &mut self,
        raw: &str,
        success: bool,
        metadata: Metadata,
    ) -> Result<(), StoreError> {
        let now = self.clock.epoch_secs();
        let key = ContactKey::new(raw);
        debug!(key = %key, success, "mark sent");
        self.commit(|records| {
            records
                .entry(key.clone())
                .or_insert_with(|| ContactRecord::new(key))
                .record_send(now, success, metadata);
        })
    }

    /// Permanently block a target. Keeps `last_sent_at`.
    pub fn block(&mut self, raw: &str, reason: impl Into<String>) -> Result<(), StoreError> {
        let key = ContactKey::new(raw);
        let reason = reason.into();
        info!(key = %key, reason = %reason, "contact blocked");
        self.commit(|records| {
            records
                .entry(key.clone())
                .or_insert_with(|| ContactRecord::new(key))
                .block(reason);
        })
    }

    /// Lift a block. Returns whether a record existed.
    pub fn unblock(&mut self, raw: &str) -> Result<bool, StoreError> {
        let key = ContactKey::new(raw);
        if !self.records.contains_key(&key) {
            return Ok(false);
        }
        self.commit(|records| {
            if let Some(record) = records.get_mut(&key) {
                record.unblock();
            }
        })?;
        info!(key = %key, "contact unblocked");
        Ok(true)
    }

    /// Forget a target entirely. Returns whether a record existed.
    pub fn reset(&mut self, raw: &str) -> Result<bool, StoreError> {
        let key = ContactKey::new(raw);
        if !self.records.contains_key(&key) {
            return Ok(false);
        }
        self.commit(|records| {
            records.remove(&key);
        })?;
        info!(key = %key, "contact reset");
        Ok(true)
    }

    /// Forget every target. Returns how many records were dropped.
    pub fn reset_all(&mut self) -> Result<usize, StoreError> {
        let removed = self.records.len();
        self.commit(|records| records.clear())?;
        warn!(removed, "all contacts reset");
        Ok(removed)
    }

    /// Drop every record currently in cooldown; blocked records stay.
    pub fn reset_cooldowns(&mut self) -> Result<usize, StoreError> {
        let now = self.clock.epoch_secs();
        let window = self.cooldown;
        let removed = self
            .records
            .values()
            .filter(|r| CheckResult::from_record(r, now, window).status == ContactStatus::Cooldown)
            .count();
        if removed > 0 {
            self.commit(|records| {
                records.retain(|_, record| {
                    CheckResult::from_record(record, now, window).status
                        != ContactStatus::Cooldown
                });
            })?;
            info!(removed, "cooldown records reset");
        }
        Ok(removed)
    }

    /// Successful sends recorded within the trailing `window`.
    pub fn sent_within(&self, window: Duration) -> usize {
        let cutoff = self.clock.epoch_secs() - window.as_secs_f64();
        self.records
            .values()
            .filter(|r| r.success && r.last_sent_at.is_some_and(|at| at >= cutoff))
            .count()
    }

    pub fn stats(&self) -> StoreStats {
        let now = self.clock.epoch_secs();
        let mut stats = StoreStats {
            total_contacts: self.records.len(),
            storage_size_bytes: fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0),
            ..StoreStats::default()
        };
        for record in self.records.values() {
            match CheckResult::from_record(record, now, self.cooldown).status {
                ContactStatus::Blocked => stats.blocked += 1,
                ContactStatus::Cooldown => stats.in_cooldown += 1,
                ContactStatus::Available | ContactStatus::New => stats.available += 1,
            }
        }
        stats
    }

    /// Write every record as a flat JSON array. Returns the entry count.
    pub fn export_history(&self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let path = path.as_ref();
        let entries: Vec<HistoryEntry> = self.records.values().map(HistoryEntry::from).collect();
        let json = serde_json::to_vec_pretty(&entries)?;
        persist::write_atomic(path, &json)?;
        info!(path = %path.display(), entries = entries.len(), "history exported");
        Ok(entries.len())
    }

    /// Merge a flat JSON array of entries, overwriting same-key records.
    /// Returns the number of records written.
    pub fn import_history(&mut self, path: impl AsRef<Path>) -> Result<usize, StoreError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        let entries: Vec<HistoryEntry> =
            serde_json::from_str(&contents).map_err(|source| StoreError::Import {
                path: path.to_path_buf(),
                source,
            })?;

        let mut incoming = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match entry.into_record() {
                Some(record) => incoming.push(record),
                None => warn!(index, "history entry without url or key skipped"),
            }
        }
        let imported = incoming.len();
        if imported > 0 {
            self.commit(|records| {
                for record in incoming {
                    records.insert(record.key.clone(), record);
                }
            })?;
        }
        info!(path = %path.display(), imported, "history imported");
        Ok(imported)
    }

    /// Write current state to disk.
    pub fn flush(&mut self) -> Result<(), StoreError> {
        persist::save(&self.path, &self.records)
    }

    /// Flush and release.
    pub fn close(mut self) -> Result<(), StoreError> {
        self.flush()?;
        debug!(path = %self.path.display(), "contact store closed");
        Ok(())
    }

    /// Apply `change` and flush. On a failed flush the change is undone and
    /// the error returned.
    fn commit(
        &mut self,
        change: impl FnOnce(&mut BTreeMap<ContactKey, ContactRecord>),
    ) -> Result<(), StoreError> {
        let before = self.records.clone();
        change(&mut self.records);
        if let Err(e) = self.flush() {
            self.records = before;
            warn!(path = %self.path.display(), error = %e, "flush failed, change rolled back");
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::ManualClock;
    use chrono::{TimeZone, Utc};

    const DAY: Duration = Duration::from_secs(86_400);

    fn store_in(dir: &Path) -> (ContactStore, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap());
        let store = ContactStore::open_with_clock(dir, DAY, Arc::new(clock.clone())).unwrap();
        (store, clock)
    }

    #[test]
    fn open_creates_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("cache").join("contacts");
        let store = ContactStore::open(&nested, DAY).unwrap();
        assert!(nested.is_dir());
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_target_is_new() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (store, _) = store_in(dir.path());

        let check = store.check("https://x.com/in/nobody");
        assert_eq!(check.status, ContactStatus::New);
        assert!(check.can_send);
        assert!(check.record.is_none());
    }

    #[test]
    fn sent_target_cools_down_then_becomes_available() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, clock) = store_in(dir.path());
        let url = "https://x.com/in/cool";

        store.mark_sent(url, true, Metadata::new()).unwrap();
        let check = store.check(url);
        assert_eq!(check.status, ContactStatus::Cooldown);
        assert!(!check.can_send);
        assert_eq!(check.cooldown_remaining, Some(DAY));

        clock.advance(DAY - Duration::from_secs(1));
        assert_eq!(store.check(url).status, ContactStatus::Cooldown);

        clock.advance(Duration::from_secs(1));
        let check = store.check(url);
        assert_eq!(check.status, ContactStatus::Available);
        assert!(check.can_send);
        assert_eq!(check.cooldown_remaining, None);
    }

    #[test]
    fn url_variants_address_one_record() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());

        store
            .mark_sent("https://x.com/in/Test-User/", true, Metadata::new())
            .unwrap();
        assert_eq!(store.check("https://x.com/in/test-user?param=1").status, ContactStatus::Cooldown);
        store.block("HTTPS://X.COM/IN/TEST-USER", "declined").unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn block_overrides_and_unblock_restores_cooldown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, clock) = store_in(dir.path());
        let url = "https://x.com/in/b";

        store.mark_sent(url, true, Metadata::new()).unwrap();
        store.block(url, "user declined").unwrap();
        let check = store.check(url);
        assert_eq!(check.status, ContactStatus::Blocked);
        assert!(!check.can_send);
        assert_eq!(check.cooldown_remaining, None);
        assert_eq!(
            check.record.unwrap().block_reason.as_deref(),
            Some("user declined")
        );

        // still blocked after the window passes
        clock.advance(DAY * 2);
        assert_eq!(store.check(url).status, ContactStatus::Blocked);

        assert!(store.unblock(url).unwrap());
        assert_eq!(store.check(url).status, ContactStatus::Available);
    }

    #[test]
    fn unblock_keeps_last_sent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());
        let url = "https://x.com/in/c";

        store.mark_sent(url, true, Metadata::new()).unwrap();
        store.block(url, "oops").unwrap();
        store.unblock(url).unwrap();
        assert_eq!(store.check(url).status, ContactStatus::Cooldown);
    }

    #[test]
    fn block_only_record_unblocks_to_available() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());
        store.block("a", "manual").unwrap();
        store.unblock("a").unwrap();
        assert_eq!(store.check("a").status, ContactStatus::Available);
    }

    #[test]
    fn unblock_and_reset_of_unknown_target_are_noops() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());
        assert!(!store.unblock("ghost").unwrap());
        assert!(!store.reset("ghost").unwrap());
    }

    #[test]
    fn reset_forgets_target() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());
        store.mark_sent("a", true, Metadata::new()).unwrap();
        assert!(store.reset("A/").unwrap());
        assert_eq!(store.check("a").status, ContactStatus::New);
    }

    #[test]
    fn reset_all_empties_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, _) = store_in(dir.path());
        for i in 0..5 {
            store
                .mark_sent(&format!("https://x.com/in/user-{i}"), true, Metadata::new())
                .unwrap();
        }
        assert_eq!(store.reset_all().unwrap(), 5);
        assert_eq!(store.stats().total_contacts, 0);
    }

    #[test]
    fn reset_cooldowns_spares_blocked_and_available() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, clock) = store_in(dir.path());
        store.mark_sent("old", true, Metadata::new()).unwrap();
        clock.advance(DAY * 2);
        store.mark_sent("fresh", true, Metadata::new()).unwrap();
        store.block("blocked", "manual").unwrap();

        assert_eq!(store.reset_cooldowns().unwrap(), 1);
        assert!(store.get("fresh").is_none());
        assert!(store.get("old").is_some());
        assert!(store.get("blocked").is_some());
    }

    #[test]
    fn stats_follow_current_window() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, clock) = store_in(dir.path());
        store.mark_sent("a", true, Metadata::new()).unwrap();
        clock.advance(Duration::from_secs(3_600));
        store.mark_sent("b", true, Metadata::new()).unwrap();
        store.block("c", "manual").unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_contacts, 3);
        assert_eq!(stats.in_cooldown, 2);
        assert_eq!(stats.blocked, 1);
        assert_eq!(stats.available, 0);
        assert!(stats.storage_size_bytes > 0);

        // shrink the window: "a" (1h old) leaves cooldown, "b" stays
        store.set_cooldown(Duration::from_secs(1_800));
        clock.advance(Duration::from_secs(60));
        let stats = store.stats();
        assert_eq!(stats.in_cooldown, 1);
        assert_eq!(stats.available, 1);
    }

    #[test]
    fn sent_within_counts_recent_successes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (mut store, clock) = store_in(dir.path());
        store.mark_sent("a", true, Metadata::new()).unwrap();
        clock.advance(DAY + Duration::from_secs(1));
        store.mark_sent("b", true, Metadata::new()).unwrap();
        store.mark_sent("c", false, Metadata::new()).unwrap();

        assert_eq!(store.sent_within(DAY), 1);
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let (mut store, _) = store_in(dir.path());
            store.mark_sent("a", true, Metadata::new()).unwrap();
            store.block("b", "declined").unwrap();
            store.close().unwrap();
        }
        let (store, _) = store_in(dir.path());
        assert_eq!(store.len(), 2);
        assert_eq!(store.check("a").status, ContactStatus::Cooldown);
        assert_eq!(store.check("b").status, ContactStatus::Blocked);
    }
}
