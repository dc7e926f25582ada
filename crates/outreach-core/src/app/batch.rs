//! BatchRunner - テンプレートを URL リストへ順番に送る
//!
//! ContactStore と Dispatcher を組み合わせる呼び出し側のワークフロー。
//! 二つのコンポーネントは互いを知らない。つなぐのはこのモジュールだけ。
//!
//! # フロー（1 ターゲットごと）
//! 1. 日次上限チェック（`auto_stop_on_limit` のとき）
//! 2. ContactStore::check() で冷却中 / ブロック済みを除外（`force` で無視）
//! 3. テンプレート展開（`template_variables` + `url`）
//! 4. Dispatcher::send()
//! 5. 成功系なら mark_sent、`blocked` ならブロック登録して全体停止

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, info_span, warn};

use crate::config::OutreachConfig;
use crate::dispatch::Dispatcher;
use crate::domain::{ContactStatus, DispatchOutcome, Metadata, OutcomeKind, StoreError};
use crate::ports::{
    Clock, IdGenerator, OutreachAction, RunId, Sleeper, SystemClock, ThreadSleeper, UlidGenerator,
};
use crate::store::ContactStore;
use crate::template;

/// Reason recorded on a target whose send tripped the remote rate limit.
pub const RATE_LIMIT_REASON: &str = "rate limit detected";

const DAY: Duration = Duration::from_secs(86_400);

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Only check eligibility. No sends, no store writes, no pauses.
    pub dry_run: bool,
    /// Send even to targets in cooldown or blocked.
    pub force: bool,
    /// Process at most this many targets from the list.
    pub max_targets: Option<usize>,
    /// Stop once this many successful sends exist in the trailing 24h.
    pub daily_limit: Option<usize>,
    pub pause_min: Duration,
    pub pause_max: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            force: false,
            max_targets: None,
            daily_limit: None,
            pause_min: Duration::ZERO,
            pause_max: Duration::ZERO,
        }
    }
}

impl BatchOptions {
    pub fn from_config(config: &OutreachConfig) -> Self {
        Self {
            daily_limit: config
                .safety
                .auto_stop_on_limit
                .then_some(config.safety.max_daily as usize),
            pause_min: Duration::from_secs_f64(config.delay.min_seconds.max(0.0)),
            pause_max: Duration::from_secs_f64(config.delay.max_seconds.max(0.0)),
            ..Self::default()
        }
    }
}

/// What happened to one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Sent,
    WouldSend,
    Cooldown,
    /// Blocked in the store; never dispatched.
    Skipped,
    Failed,
    /// Dispatch reported a rate limit. The batch stops here.
    RateLimited,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub url: String,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<DispatchOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_remaining_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_reason: Option<String>,
}

impl BatchEntry {
    fn new(url: &str, status: EntryStatus) -> Self {
        Self {
            url: url.to_string(),
            status,
            outcome: None,
            cooldown_remaining_secs: None,
            block_reason: None,
        }
    }

    fn dispatched(url: &str, outcome: DispatchOutcome) -> Self {
        let status = if outcome.is_success() {
            EntryStatus::Sent
        } else if outcome.kind == OutcomeKind::Blocked {
            EntryStatus::RateLimited
        } else {
            EntryStatus::Failed
        };
        Self {
            outcome: Some(outcome),
            ..Self::new(url, status)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltReason {
    RateLimited,
    DailyLimit,
}

/// Summary of one batch run. Serialised as the run log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub run_id: RunId,
    pub template: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub success: usize,
    pub would_send: usize,
    pub cooldown: usize,
    pub skipped: usize,
    pub failed: usize,
    pub retried: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<HaltReason>,
    pub entries: Vec<BatchEntry>,
}

impl BatchReport {
    /// Targets never reached because the batch halted.
    pub fn unprocessed(&self) -> usize {
        self.total.saturating_sub(self.entries.len())
    }

    fn push(&mut self, entry: BatchEntry) {
        match entry.status {
            EntryStatus::Sent => self.success += 1,
            EntryStatus::WouldSend => self.would_send += 1,
            EntryStatus::Cooldown => self.cooldown += 1,
            EntryStatus::Skipped => self.skipped += 1,
            EntryStatus::Failed | EntryStatus::RateLimited => self.failed += 1,
        }
        self.entries.push(entry);
    }
}

/// Progress notifications for interactive callers.
#[derive(Debug)]
pub enum BatchEvent<'a> {
    Dispatching { index: usize, total: usize, url: &'a str },
    Retrying { url: &'a str, attempt: u32 },
    Pausing { delay: Duration },
    Finished { index: usize, total: usize, entry: &'a BatchEntry },
    Halted { reason: HaltReason },
}

pub struct BatchRunner<'a> {
    store: &'a mut ContactStore,
    dispatcher: &'a mut Dispatcher,
    options: BatchOptions,
    variables: BTreeMap<String, String>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    run_id: Option<RunId>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        store: &'a mut ContactStore,
        dispatcher: &'a mut Dispatcher,
        options: BatchOptions,
    ) -> Self {
        Self {
            store,
            dispatcher,
            options,
            variables: BTreeMap::new(),
            sleeper: Arc::new(ThreadSleeper),
            clock: Arc::new(SystemClock),
            rng: StdRng::from_entropy(),
            run_id: None,
        }
    }

    pub fn variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.variables = variables;
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Seed the pause RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn run_id(mut self, run_id: RunId) -> Self {
        self.run_id = Some(run_id);
        self
    }

    /// Process `targets` in order. Only store failures are errors; every
    /// dispatch result lands in the report.
    pub fn run<A>(
        &mut self,
        targets: &[String],
        template_name: &str,
        template_body: &str,
        action: &mut A,
        on_event: &mut dyn FnMut(BatchEvent<'_>),
    ) -> Result<BatchReport, StoreError>
    where
        A: OutreachAction + ?Sized,
    {
        let run_id = self
            .run_id
            .unwrap_or_else(|| UlidGenerator::new(Arc::clone(&self.clock)).generate_run_id());
        let targets = match self.options.max_targets {
            Some(max) => &targets[..targets.len().min(max)],
            None => targets,
        };
        let total = targets.len();
        let span = info_span!("batch", run_id = %run_id, total, dry_run = self.options.dry_run);
        let _enter = span.enter();

        let retried_before = self.dispatcher.stats().retried;
        let mut report = BatchReport {
            run_id,
            template: template_name.to_string(),
            dry_run: self.options.dry_run,
            started_at: self.clock.now(),
            finished_at: self.clock.now(),
            total,
            success: 0,
            would_send: 0,
            cooldown: 0,
            skipped: 0,
            failed: 0,
            retried: 0,
            halted: None,
            entries: Vec::with_capacity(total),
        };

        let mut dispatched_any = false;
        for (index, url) in targets.iter().enumerate() {
            if let Some(limit) = self.daily_limit_reached() {
                info!(limit, "daily send limit reached");
                report.halted = Some(HaltReason::DailyLimit);
                on_event(BatchEvent::Halted {
                    reason: HaltReason::DailyLimit,
                });
                break;
            }

            if let Some(entry) = self.ineligible(url) {
                on_event(BatchEvent::Finished {
                    index,
                    total,
                    entry: &entry,
                });
                report.push(entry);
                continue;
            }

            if self.options.dry_run {
                let entry = BatchEntry::new(url, EntryStatus::WouldSend);
                on_event(BatchEvent::Finished {
                    index,
                    total,
                    entry: &entry,
                });
                report.push(entry);
                continue;
            }

            if dispatched_any {
                let delay = self.sample_pause();
                on_event(BatchEvent::Pausing { delay });
                self.sleeper.sleep(delay);
            }
            dispatched_any = true;

            on_event(BatchEvent::Dispatching { index, total, url });
            let entry = self.dispatch_one(
                url,
                template_name,
                template_body,
                &run_id,
                action,
                on_event,
            )?;
            let rate_limited = entry.status == EntryStatus::RateLimited;
            on_event(BatchEvent::Finished {
                index,
                total,
                entry: &entry,
            });
            report.push(entry);

            if rate_limited {
                warn!(url = %url, "rate limit detected; halting batch");
                report.halted = Some(HaltReason::RateLimited);
                on_event(BatchEvent::Halted {
                    reason: HaltReason::RateLimited,
                });
                break;
            }
        }

        report.retried = self.dispatcher.stats().retried - retried_before;
        report.finished_at = self.clock.now();
        info!(
            success = report.success,
            would_send = report.would_send,
            cooldown = report.cooldown,
            skipped = report.skipped,
            failed = report.failed,
            "batch finished"
        );
        Ok(report)
    }

    fn daily_limit_reached(&self) -> Option<usize> {
        if self.options.dry_run {
            return None;
        }
        let limit = self.options.daily_limit?;
        (self.store.sent_within(DAY) >= limit).then_some(limit)
    }

    fn ineligible(&self, url: &str) -> Option<BatchEntry> {
        if self.options.force {
            return None;
        }
        let check = self.store.check(url);
        match check.status {
            ContactStatus::Cooldown => Some(BatchEntry {
                cooldown_remaining_secs: check.cooldown_remaining.map(|d| d.as_secs()),
                ..BatchEntry::new(url, EntryStatus::Cooldown)
            }),
            ContactStatus::Blocked => Some(BatchEntry {
                block_reason: check.record.and_then(|r| r.block_reason),
                ..BatchEntry::new(url, EntryStatus::Skipped)
            }),
            ContactStatus::New | ContactStatus::Available => None,
        }
    }

    fn dispatch_one<A>(
        &mut self,
        url: &str,
        template_name: &str,
        template_body: &str,
        run_id: &RunId,
        action: &mut A,
        on_event: &mut dyn FnMut(BatchEvent<'_>),
    ) -> Result<BatchEntry, StoreError>
    where
        A: OutreachAction + ?Sized,
    {
        let mut variables = self.variables.clone();
        variables.insert("url".to_string(), url.to_string());
        let message = template::render(template_body, &variables);

        let mut on_retry = |attempt: u32| on_event(BatchEvent::Retrying { url, attempt });
        let outcome = self
            .dispatcher
            .send(url, &message, action, Some(&mut on_retry));

        if outcome.is_success() {
            let mut metadata = Metadata::new();
            metadata.insert("outcome".to_string(), json!(outcome.kind.as_str()));
            if let Some(detail) = &outcome.detail_status {
                metadata.insert("detail_status".to_string(), json!(detail));
            }
            metadata.insert("template".to_string(), json!(template_name));
            metadata.insert("run_id".to_string(), json!(run_id.to_string()));
            self.store.mark_sent(url, true, metadata)?;
        } else if outcome.kind == OutcomeKind::Blocked {
            self.store.block(url, RATE_LIMIT_REASON)?;
        }

        Ok(BatchEntry::dispatched(url, outcome))
    }

    fn sample_pause(&mut self) -> Duration {
        let (min, max) = (self.options.pause_min, self.options.pause_max);
        if max <= min {
            return min;
        }
        Duration::from_secs_f64(self.rng.gen_range(min.as_secs_f64()..=max.as_secs_f64()))
    }
}
