//! Dispatcher: one logical send, a bounded sequence of tries.
//!
//! The dispatcher never returns an error for anything the action does. Every
//! path through [`Dispatcher::send`] ends in a [`DispatchOutcome`]. Only bad
//! configuration fails, and it fails at construction.
//!
//! Scheduling is synchronous: backoff sleeps block the calling thread through
//! the [`Sleeper`] port.

pub mod backoff;
pub mod classifier;

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, info_span, warn};

use crate::config::RetryConfig;
use crate::domain::{ActionError, ConfigError, DispatchOutcome, OutcomeKind, SessionStats};
use crate::ports::{Clock, OutreachAction, Sleeper, SystemClock, ThreadSleeper};

pub use self::backoff::BackoffSchedule;
pub use self::classifier::{Classification, DefaultClassifier, OutcomeClassifier};

const DEFAULT_MAX_ATTEMPTS: u32 = 2;
const DEFAULT_JITTER: Duration = Duration::from_secs(2);

pub struct Dispatcher {
    max_attempts: u32,
    backoff: BackoffSchedule,
    jitter: Duration,
    classifier: Box<dyn OutcomeClassifier>,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    stats: SessionStats,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("max_attempts", &self.max_attempts)
            .field("backoff", &self.backoff)
            .field("jitter", &self.jitter)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// Dispatcher with production ports and the default classifier.
    pub fn new(max_attempts: u32, backoff: BackoffSchedule) -> Result<Self, ConfigError> {
        Self::builder()
            .max_attempts(max_attempts)
            .backoff(backoff)
            .build()
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Session counters since construction.
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Perform one logical send of `payload` to `url`.
    ///
    /// `on_retry(attempt)` runs before each backoff sleep, with the number of
    /// the attempt that just failed. It cannot influence the loop.
    pub fn send<A>(
        &mut self,
        url: &str,
        payload: &str,
        action: &mut A,
        mut on_retry: Option<&mut dyn FnMut(u32)>,
    ) -> DispatchOutcome
    where
        A: OutreachAction + ?Sized,
    {
        let span = info_span!("dispatch", url = %url, max_attempts = self.max_attempts);
        let _enter = span.enter();

        let mut last_error: Option<ActionError> = None;

        for attempt in 1..=self.max_attempts {
            let is_last = attempt == self.max_attempts;
            debug!(attempt, "performing action");

            match action.perform(url, payload) {
                Ok(raw) => {
                    let detail = raw.detail_status().map(str::to_owned);
                    match self.classifier.classify(&raw) {
                        Classification::Success(kind) => {
                            let outcome = DispatchOutcome::new(kind, url, self.clock.now(), attempt)
                                .with_detail_status(detail);
                            return self.finish(outcome);
                        }
                        Classification::Blocked => {
                            let message = raw.message().unwrap_or("blocked by remote side");
                            let outcome =
                                DispatchOutcome::new(OutcomeKind::Blocked, url, self.clock.now(), attempt)
                                    .with_error(message)
                                    .with_detail_status(detail);
                            return self.finish(outcome);
                        }
                        Classification::RetryableFailure => {
                            let message = raw
                                .message()
                                .unwrap_or("action reported failure")
                                .to_string();
                            if is_last {
                                let outcome = DispatchOutcome::new(
                                    OutcomeKind::Failed,
                                    url,
                                    self.clock.now(),
                                    attempt,
                                )
                                .with_error(message)
                                .with_detail_status(detail);
                                return self.finish(outcome);
                            }
                            warn!(attempt, error = %message, "attempt failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(attempt, error = %err, "action raised an error");
                    last_error = Some(err);
                    if is_last {
                        break;
                    }
                }
            }

            if let Some(callback) = on_retry.as_deref_mut() {
                callback(attempt);
            }
            self.back_off(attempt);
        }

        // Every attempt ended in an error rather than an explicit answer.
        let kind = match last_error {
            Some(ActionError::Timeout(_)) => OutcomeKind::Timeout,
            _ => OutcomeKind::RetriesExhausted,
        };
        let summary = match &last_error {
            Some(err) => format!("all {} attempts failed; last error: {err}", self.max_attempts),
            None => format!("all {} attempts failed", self.max_attempts),
        };
        let outcome = DispatchOutcome::new(kind, url, self.clock.now(), self.max_attempts)
            .with_error(summary);
        self.finish(outcome)
    }

    fn back_off(&mut self, attempt: u32) {
        let base = self.backoff.delay_for(attempt);
        let jitter = self.sample_jitter();
        let delay = base + jitter;
        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying after backoff"
        );
        self.sleeper.sleep(delay);
        self.stats.retried += 1;
    }

    fn sample_jitter(&mut self) -> Duration {
        if self.jitter.is_zero() {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.rng.gen_range(0.0..=self.jitter.as_secs_f64()))
    }

    fn finish(&mut self, outcome: DispatchOutcome) -> DispatchOutcome {
        self.stats.record(outcome.kind);
        if outcome.is_success() {
            info!(
                outcome = %outcome.kind,
                attempts = outcome.attempts_made,
                detail = outcome.detail_status.as_deref().unwrap_or("-"),
                "dispatch finished"
            );
        } else {
            warn!(
                outcome = %outcome.kind,
                attempts = outcome.attempts_made,
                error = outcome.error_message.as_deref().unwrap_or("-"),
                "dispatch finished"
            );
        }
        outcome
    }
}

/// Builder for [`Dispatcher`]. Validation happens in [`DispatcherBuilder::build`].
pub struct DispatcherBuilder {
    max_attempts: u32,
    backoff: Option<BackoffSchedule>,
    backoff_error: Option<ConfigError>,
    jitter: Duration,
    classifier: Option<Box<dyn OutcomeClassifier>>,
    sleeper: Option<Arc<dyn Sleeper>>,
    clock: Option<Arc<dyn Clock>>,
    seed: Option<u64>,
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: None,
            backoff_error: None,
            jitter: DEFAULT_JITTER,
            classifier: None,
            sleeper: None,
            clock: None,
            seed: None,
        }
    }
}

impl DispatcherBuilder {
    /// Start from a `[retry]` config section.
    pub fn from_config(config: &RetryConfig) -> Self {
        let builder = Self::default()
            .max_attempts(config.max_attempts)
            .jitter(Duration::from_secs_f64(config.jitter_secs.max(0.0)));
        match BackoffSchedule::from_secs(&config.delays) {
            Ok(schedule) => builder.backoff(schedule),
            Err(e) => Self {
                backoff_error: Some(e),
                ..builder
            },
        }
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn backoff(mut self, backoff: BackoffSchedule) -> Self {
        self.backoff = Some(backoff);
        self.backoff_error = None;
        self
    }

    /// Upper bound of the uniform random delay added to each backoff.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn classifier(mut self, classifier: impl OutcomeClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    pub fn sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = Some(sleeper);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Seed the jitter RNG for reproducible delays.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ConfigError> {
        if self.max_attempts < 1 {
            return Err(ConfigError::InvalidMaxAttempts(self.max_attempts));
        }
        if let Some(e) = self.backoff_error {
            return Err(e);
        }
        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Dispatcher {
            max_attempts: self.max_attempts,
            backoff: self.backoff.unwrap_or_default(),
            jitter: self.jitter,
            classifier: self
                .classifier
                .unwrap_or_else(|| Box::new(DefaultClassifier::new())),
            sleeper: self.sleeper.unwrap_or_else(|| Arc::new(ThreadSleeper)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            rng,
            stats: SessionStats::default(),
        })
    }
}
