//! Plain-text rendering for terminal output.

use std::fmt::Write as _;
use std::time::Duration;

use outreach_core::app::{BatchEntry, BatchReport, EntryStatus, HaltReason};
use outreach_core::domain::StoreStats;
use outreach_core::ports::from_epoch_secs;

const URL_WIDTH: usize = 50;

pub fn days(d: Duration) -> String {
    format!("{:.1}d", d.as_secs_f64() / 86_400.0)
}

pub fn short_url(url: &str) -> String {
    if url.chars().count() <= URL_WIDTH {
        return url.to_string();
    }
    let head: String = url.chars().take(URL_WIDTH - 3).collect();
    format!("{head}...")
}

pub fn timestamp(epoch_secs: Option<f64>) -> String {
    epoch_secs
        .and_then(from_epoch_secs)
        .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn entry_line(index: usize, total: usize, entry: &BatchEntry) -> String {
    let position = format!("[{}/{}]", index + 1, total);
    let url = short_url(&entry.url);
    match entry.status {
        EntryStatus::Sent => {
            let (kind, attempts) = entry
                .outcome
                .as_ref()
                .map(|o| (o.kind.as_str(), o.attempts_made))
                .unwrap_or(("success", 1));
            format!("ok      {position} {kind} after {attempts} attempt(s): {url}")
        }
        EntryStatus::WouldSend => format!("dry-run {position} would send: {url}"),
        EntryStatus::Cooldown => {
            let left = entry
                .cooldown_remaining_secs
                .map(|s| days(Duration::from_secs(s)))
                .unwrap_or_default();
            format!("wait    {position} cooling down ({left} left): {url}")
        }
        EntryStatus::Skipped => format!("skip    {position} blocked: {url}"),
        EntryStatus::Failed | EntryStatus::RateLimited => {
            let mut line = format!("FAIL    {position} {url}");
            if let Some(outcome) = &entry.outcome {
                let _ = write!(
                    line,
                    " ({}, {} attempt(s))",
                    outcome.kind, outcome.attempts_made
                );
                if let Some(error) = &outcome.error_message {
                    let _ = write!(line, "\n        {error}");
                }
            }
            line
        }
    }
}

pub fn report(report: &BatchReport) -> String {
    let mut out = String::new();
    let total = report.total;
    let rows = [
        ("sent", report.success),
        ("would send", report.would_send),
        ("cooldown", report.cooldown),
        ("skipped", report.skipped),
        ("failed", report.failed),
        ("not reached", report.unprocessed()),
    ];

    let _ = writeln!(out, "{:<12} {:>6} {:>7}", "status", "count", "share");
    for (label, count) in rows {
        if count == 0 && matches!(label, "would send" | "not reached") {
            continue;
        }
        let _ = writeln!(out, "{label:<12} {count:>6} {:>7}", percent(count, total));
    }
    let _ = writeln!(out, "{:<12} {:>6}", "retries", report.retried);

    match report.halted {
        Some(HaltReason::RateLimited) => {
            out.push_str(
                "\nStopped: the remote side is rate limiting. Wait 24h or lower max_daily.\n",
            );
        }
        Some(HaltReason::DailyLimit) => {
            out.push_str("\nStopped: daily send limit reached.\n");
        }
        None => {}
    }
    out
}

pub fn stats(stats: &StoreStats) -> String {
    format!(
        "tracked contacts: {}\nin cooldown:      {}\navailable:        {}\nblocked:          {}\nstore size:       {:.2} KiB\n",
        stats.total_contacts,
        stats.in_cooldown,
        stats.available,
        stats.blocked,
        stats.storage_size_bytes as f64 / 1024.0
    )
}

fn percent(count: usize, total: usize) -> String {
    if total == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", count as f64 * 100.0 / total as f64)
}
