//! Backoff schedule: decides the base delay before each retry.

use std::time::Duration;

use crate::domain::ConfigError;

/// Ordered list of base delays between attempts.
///
/// The last entry is held for every attempt beyond the list's length, so a
/// short schedule can serve a longer retry budget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    delays: Vec<Duration>,
}

impl BackoffSchedule {
    pub fn new(delays: Vec<Duration>) -> Result<Self, ConfigError> {
        if delays.is_empty() {
            return Err(ConfigError::EmptyBackoffSchedule);
        }
        Ok(Self { delays })
    }

    pub fn from_secs(secs: &[u64]) -> Result<Self, ConfigError> {
        Self::new(secs.iter().copied().map(Duration::from_secs).collect())
    }

    /// Base delay after the failure of attempt number `attempt` (1-indexed).
    ///
    /// Example with `[3s, 7s, 15s]`:
    /// - attempt 1: 3s
    /// - attempt 2: 7s
    /// - attempt 3: 15s
    /// - attempt 4+: 15s
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let index = (attempt.saturating_sub(1) as usize).min(self.delays.len() - 1);
        self.delays[index]
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for BackoffSchedule {
    fn default() -> Self {
        Self {
            delays: vec![
                Duration::from_secs(3),
                Duration::from_secs(7),
                Duration::from_secs(15),
            ],
        }
    }
}
