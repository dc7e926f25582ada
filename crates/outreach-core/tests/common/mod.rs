// Common test utilities

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use outreach_core::dispatch::{BackoffSchedule, Dispatcher};
use outreach_core::ports::{ManualClock, OutreachAction, RecordingSleeper};
use outreach_core::{ActionError, RawActionResult};

pub const DAY: Duration = Duration::from_secs(86_400);

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

/// Action that replays a fixed list of answers and records every call.
#[derive(Default)]
pub struct ScriptedAction {
    script: VecDeque<Result<RawActionResult, ActionError>>,
    pub calls: Vec<(String, String)>,
}

impl ScriptedAction {
    pub fn new(script: impl IntoIterator<Item = Result<RawActionResult, ActionError>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            calls: Vec::new(),
        }
    }
}

impl OutreachAction for ScriptedAction {
    fn perform(&mut self, url: &str, payload: &str) -> Result<RawActionResult, ActionError> {
        self.calls.push((url.to_string(), payload.to_string()));
        self.script
            .pop_front()
            .unwrap_or_else(|| Err(ActionError::Transient("script exhausted".into())))
    }
}

pub fn ok() -> Result<RawActionResult, ActionError> {
    Ok(RawActionResult::legacy(true))
}

pub fn fail() -> Result<RawActionResult, ActionError> {
    Ok(RawActionResult::legacy(false))
}

pub fn structured(success: bool, status: &str, message: &str) -> Result<RawActionResult, ActionError> {
    Ok(RawActionResult::structured(success, status, message))
}

/// Dispatcher with zero jitter, recorded sleeps and a manual clock.
pub fn dispatcher(max_attempts: u32, delays: &[u64]) -> (Dispatcher, RecordingSleeper, ManualClock) {
    let sleeper = RecordingSleeper::new();
    let clock = ManualClock::new(start_time());
    let dispatcher = Dispatcher::builder()
        .max_attempts(max_attempts)
        .backoff(BackoffSchedule::from_secs(delays).unwrap())
        .jitter(Duration::ZERO)
        .sleeper(Arc::new(sleeper.clone()))
        .clock(Arc::new(clock.clone()))
        .build()
        .unwrap();
    (dispatcher, sleeper, clock)
}

/// `MakeWriter` target that keeps formatted log lines in memory.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a subscriber writing plain text into the returned buffer.
pub fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, logs.contents())
}
