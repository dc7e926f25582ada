//! Classification of raw action results.
//!
//! This module defines what a single action answer means for the retry loop:
//! a terminal success of some kind, a rate-limit signal that must stop
//! everything, or an ordinary failure worth retrying.

use crate::domain::{OutcomeKind, RawActionResult};

/// What one raw result means for the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Terminal success; carries the success-family kind.
    Success(OutcomeKind),

    /// The external side refuses to serve us. Terminal, never retried.
    Blocked,

    /// Recoverable failure; retried while attempts remain.
    RetryableFailure,
}

/// Trait for mapping raw action results onto [`Classification`].
///
/// Classifiers are pure: same input, same answer, no side effects.
pub trait OutcomeClassifier: Send + Sync {
    fn classify(&self, result: &RawActionResult) -> Classification;
}

/// Detail statuses that mean "rate limited or restricted".
const BLOCK_STATUSES: &[&str] = &["blocked", "rate_limited", "restricted", "limit_reached"];

/// Message fragments with the same meaning, matched case-insensitively.
const BLOCK_PHRASES: &[&str] = &[
    "weekly invitation limit",
    "too many requests",
    "temporarily restricted",
    "unusual activity",
];

/// Default classifier.
///
/// - success + `pending` -> Pending
/// - success + `already_connected` / `already_friend` -> AlreadyConnected
/// - success otherwise -> Success
/// - failure with a block status or block phrase -> Blocked
/// - any other failure -> RetryableFailure
#[derive(Debug, Clone)]
pub struct DefaultClassifier {
    block_statuses: Vec<String>,
    block_phrases: Vec<String>,
}

impl DefaultClassifier {
    pub fn new() -> Self {
        Self {
            block_statuses: BLOCK_STATUSES.iter().map(|s| s.to_string()).collect(),
            block_phrases: BLOCK_PHRASES.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_block_status(mut self, status: impl Into<String>) -> Self {
        self.block_statuses.push(status.into().to_lowercase());
        self
    }

    pub fn with_block_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.block_phrases.push(phrase.into().to_lowercase());
        self
    }

    fn is_block_signal(&self, status: &str, message: &str) -> bool {
        let status = status.to_lowercase();
        let message = message.to_lowercase();
        self.block_statuses.iter().any(|s| *s == status)
            || self.block_phrases.iter().any(|p| message.contains(p.as_str()))
    }
}

impl Default for DefaultClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl OutcomeClassifier for DefaultClassifier {
    fn classify(&self, result: &RawActionResult) -> Classification {
        match result {
            RawActionResult::Structured {
                success: true,
                status,
                ..
            } => match status.as_str() {
                "pending" => Classification::Success(OutcomeKind::Pending),
                "already_connected" | "already_friend" => {
                    Classification::Success(OutcomeKind::AlreadyConnected)
                }
                _ => Classification::Success(OutcomeKind::Success),
            },
            RawActionResult::Structured {
                success: false,
                status,
                message,
            } => {
                if self.is_block_signal(status, message) {
                    Classification::Blocked
                } else {
                    Classification::RetryableFailure
                }
            }
            RawActionResult::Legacy { succeeded: true } => {
                Classification::Success(OutcomeKind::Success)
            }
            RawActionResult::Legacy { succeeded: false } => Classification::RetryableFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("sent", OutcomeKind::Success)]
    #[case("unknown", OutcomeKind::Success)]
    #[case("pending", OutcomeKind::Pending)]
    #[case("already_connected", OutcomeKind::AlreadyConnected)]
    #[case("already_friend", OutcomeKind::AlreadyConnected)]
    fn success_details_map_to_kinds(#[case] status: &str, #[case] kind: OutcomeKind) {
        let raw = RawActionResult::structured(true, status, "");
        assert_eq!(
            DefaultClassifier::new().classify(&raw),
            Classification::Success(kind)
        );
    }

    #[rstest]
    #[case("rate_limited", "")]
    #[case("BLOCKED", "")]
    #[case("failed", "You've reached the weekly invitation limit")]
    #[case("error", "Too Many Requests")]
    fn block_signals_are_terminal(#[case] status: &str, #[case] message: &str) {
        let raw = RawActionResult::structured(false, status, message);
        assert_eq!(DefaultClassifier::new().classify(&raw), Classification::Blocked);
    }

    #[test]
    fn ordinary_failure_is_retryable() {
        let raw = RawActionResult::structured(false, "failed", "connect button not found");
        assert_eq!(
            DefaultClassifier::new().classify(&raw),
            Classification::RetryableFailure
        );
    }

    #[test]
    fn block_status_on_success_is_still_success() {
        let raw = RawActionResult::structured(true, "blocked", "");
        assert_eq!(
            DefaultClassifier::new().classify(&raw),
            Classification::Success(OutcomeKind::Success)
        );
    }

    #[test]
    fn legacy_words() {
        let c = DefaultClassifier::new();
        assert_eq!(
            c.classify(&RawActionResult::legacy(true)),
            Classification::Success(OutcomeKind::Success)
        );
        assert_eq!(
            c.classify(&RawActionResult::legacy(false)),
            Classification::RetryableFailure
        );
    }

    #[test]
    fn custom_markers_extend_defaults() {
        let c = DefaultClassifier::new()
            .with_block_status("Captcha")
            .with_block_phrase("Verify You Are Human");

        let by_status = RawActionResult::structured(false, "captcha", "");
        let by_phrase = RawActionResult::structured(false, "error", "please verify you are human");
        assert_eq!(c.classify(&by_status), Classification::Blocked);
        assert_eq!(c.classify(&by_phrase), Classification::Blocked);
    }
}
