//! Dispatcher behavior through the public API.

mod common;

use std::time::Duration;

use common::{ScriptedAction, dispatcher, fail, ok, structured, with_captured_logs};
use outreach_core::{ActionError, OutcomeKind};
use rstest::rstest;

#[test]
fn succeeds_on_third_attempt_after_two_failures() {
    let (mut dispatcher, sleeper, _) = dispatcher(3, &[3, 7, 15]);
    let mut action = ScriptedAction::new([fail(), fail(), ok()]);
    let mut retries = Vec::new();
    let mut on_retry = |attempt: u32| retries.push(attempt);

    let outcome = dispatcher.send(
        "https://x.com/in/a",
        "hello",
        &mut action,
        Some(&mut on_retry),
    );

    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(outcome.attempts_made, 3);
    assert_eq!(retries, vec![1, 2]);
    assert_eq!(
        sleeper.delays(),
        vec![Duration::from_secs(3), Duration::from_secs(7)]
    );
    assert_eq!(dispatcher.stats().retried, 2);
}

#[test]
fn explicit_failure_on_every_attempt_is_failed() {
    let (mut dispatcher, _, _) = dispatcher(2, &[3]);
    let mut action = ScriptedAction::new([
        structured(false, "error", "button missing"),
        structured(false, "error", "button still missing"),
    ]);

    let outcome = dispatcher.send("https://x.com/in/a", "hello", &mut action, None);

    assert_eq!(outcome.kind, OutcomeKind::Failed);
    assert_eq!(outcome.attempts_made, 2);
    assert_eq!(outcome.error_message.as_deref(), Some("button still missing"));
    assert_eq!(outcome.detail_status.as_deref(), Some("error"));
}

#[test]
fn stats_count_sends_and_failures() {
    let (mut dispatcher, _, _) = dispatcher(2, &[1]);
    let mut action = ScriptedAction::new([
        ok(),
        structured(true, "pending", ""),
        Err(ActionError::Transient("page crashed".into())),
        Err(ActionError::Transient("page crashed again".into())),
    ]);

    let first = dispatcher.send("https://x.com/in/a", "m", &mut action, None);
    let second = dispatcher.send("https://x.com/in/b", "m", &mut action, None);
    let third = dispatcher.send("https://x.com/in/c", "m", &mut action, None);

    assert_eq!(first.kind, OutcomeKind::Success);
    assert_eq!(second.kind, OutcomeKind::Pending);
    assert_eq!(third.kind, OutcomeKind::RetriesExhausted);
    assert_eq!(third.attempts_made, 2);
    assert!(third.error_message.unwrap().contains("page crashed again"));

    let stats = dispatcher.stats();
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.retried, 1);
}

#[test]
fn timeout_on_last_attempt_is_timeout() {
    let (mut dispatcher, _, _) = dispatcher(2, &[1]);
    let mut action = ScriptedAction::new([
        Err(ActionError::Transient("flaky".into())),
        Err(ActionError::Timeout("30s elapsed".into())),
    ]);

    let outcome = dispatcher.send("https://x.com/in/a", "m", &mut action, None);

    assert_eq!(outcome.kind, OutcomeKind::Timeout);
    assert_eq!(dispatcher.stats().failed, 1);
}

#[test]
fn rate_limit_is_terminal_and_not_retried() {
    let (mut dispatcher, sleeper, _) = dispatcher(3, &[3]);
    let mut action = ScriptedAction::new([
        structured(false, "failed", "You have reached the weekly invitation limit"),
        ok(),
    ]);

    let outcome = dispatcher.send("https://x.com/in/a", "m", &mut action, None);

    assert_eq!(outcome.kind, OutcomeKind::Blocked);
    assert_eq!(outcome.attempts_made, 1);
    assert_eq!(action.calls.len(), 1);
    assert!(sleeper.delays().is_empty());
}

#[rstest]
#[case("already_connected", OutcomeKind::AlreadyConnected)]
#[case("pending", OutcomeKind::Pending)]
#[case("sent", OutcomeKind::Success)]
fn success_details_are_preserved(#[case] status: &str, #[case] kind: OutcomeKind) {
    let (mut dispatcher, _, _) = dispatcher(1, &[1]);
    let mut action = ScriptedAction::new([structured(true, status, "")]);

    let outcome = dispatcher.send("https://x.com/in/a", "m", &mut action, None);

    assert_eq!(outcome.kind, kind);
    assert_eq!(outcome.detail_status.as_deref(), Some(status));
    assert_eq!(dispatcher.stats().sent, 1);
}

#[test]
fn payload_reaches_the_action_unchanged() {
    let (mut dispatcher, _, _) = dispatcher(1, &[1]);
    let mut action = ScriptedAction::new([ok()]);

    dispatcher.send("https://x.com/in/a", "Hi {{name}}", &mut action, None);

    assert_eq!(
        action.calls,
        vec![("https://x.com/in/a".to_string(), "Hi {{name}}".to_string())]
    );
}

#[test]
fn retries_are_logged() {
    let (mut dispatcher, _, _) = dispatcher(2, &[3]);
    let mut action = ScriptedAction::new([fail(), ok()]);

    let (outcome, logs) =
        with_captured_logs(|| dispatcher.send("https://x.com/in/a", "m", &mut action, None));

    assert!(outcome.is_success());
    assert!(logs.contains("retrying after backoff"), "logs: {logs}");
    assert!(logs.contains("dispatch finished"), "logs: {logs}");
}
