//! Raw results reported by the external action (browser automation, script, ...).
//!
//! The action may answer with a structured object or with a legacy bare
//! `success` / `fail` word. Both are folded into [`RawActionResult`] once, at
//! the boundary, so the dispatcher only deals with one closed type.

use serde::Deserialize;
use thiserror::Error;

/// What the action reported for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawActionResult {
    Structured {
        success: bool,
        /// Fine-grained status, e.g. `sent`, `pending`, `already_connected`.
        status: String,
        message: String,
    },
    Legacy {
        succeeded: bool,
    },
}

/// The action could not produce a result at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{0}")]
    Transient(String),

    #[error("timed out: {0}")]
    Timeout(String),
}

#[derive(Debug, Deserialize)]
struct WireResult {
    success: bool,
    #[serde(default = "unknown_status")]
    status: String,
    #[serde(default)]
    message: String,
}

fn unknown_status() -> String {
    "unknown".to_string()
}

impl RawActionResult {
    pub fn structured(success: bool, status: impl Into<String>, message: impl Into<String>) -> Self {
        RawActionResult::Structured {
            success,
            status: status.into(),
            message: message.into(),
        }
    }

    pub fn legacy(succeeded: bool) -> Self {
        RawActionResult::Legacy { succeeded }
    }

    /// Parse the textual form an out-of-process action prints.
    ///
    /// Accepted shapes:
    /// - `success` / `fail` (bare or JSON-quoted)
    /// - `true` / `false`
    /// - `{"success": bool, "status": "...", "message": "..."}`
    ///
    /// Anything else is a transient failure.
    pub fn parse(text: &str) -> Result<Self, ActionError> {
        let trimmed = text.trim();
        match trimmed {
            "success" => return Ok(Self::legacy(true)),
            "fail" => return Ok(Self::legacy(false)),
            _ => {}
        }

        let value: serde_json::Value = serde_json::from_str(trimmed).map_err(|_| {
            ActionError::Transient(format!("unrecognised action output: {}", excerpt(trimmed)))
        })?;

        match value {
            serde_json::Value::Bool(succeeded) => Ok(Self::legacy(succeeded)),
            serde_json::Value::String(word) if word == "success" => Ok(Self::legacy(true)),
            serde_json::Value::String(word) if word == "fail" => Ok(Self::legacy(false)),
            serde_json::Value::Object(_) => {
                let wire: WireResult = serde_json::from_value(value).map_err(|e| {
                    ActionError::Transient(format!("malformed action result: {e}"))
                })?;
                Ok(Self::structured(wire.success, wire.status, wire.message))
            }
            other => Err(ActionError::Transient(format!(
                "unexpected action result shape: {}",
                excerpt(&other.to_string())
            ))),
        }
    }

    pub fn succeeded(&self) -> bool {
        match self {
            RawActionResult::Structured { success, .. } => *success,
            RawActionResult::Legacy { succeeded } => *succeeded,
        }
    }

    pub fn detail_status(&self) -> Option<&str> {
        match self {
            RawActionResult::Structured { status, .. } => Some(status),
            RawActionResult::Legacy { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            RawActionResult::Structured { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

fn excerpt(text: &str) -> String {
    const MAX: usize = 120;
    if text.chars().count() <= MAX {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("success", true)]
    #[case("fail\n", false)]
    #[case("\"success\"", true)]
    #[case("\"fail\"", false)]
    #[case("true", true)]
    #[case("false", false)]
    fn legacy_words_parse(#[case] text: &str, #[case] succeeded: bool) {
        assert_eq!(RawActionResult::parse(text), Ok(RawActionResult::legacy(succeeded)));
    }

    #[test]
    fn structured_object_parses() {
        let raw = RawActionResult::parse(
            r#"{"success": true, "status": "pending", "message": "invite sent"}"#,
        )
        .unwrap();
        assert!(raw.succeeded());
        assert_eq!(raw.detail_status(), Some("pending"));
        assert_eq!(raw.message(), Some("invite sent"));
    }

    #[test]
    fn missing_status_defaults_to_unknown() {
        let raw = RawActionResult::parse(r#"{"success": false}"#).unwrap();
        assert_eq!(raw.detail_status(), Some("unknown"));
        assert_eq!(raw.message(), None);
    }

    #[rstest]
    #[case("")]
    #[case("sent")]
    #[case("42")]
    #[case("[1, 2]")]
    #[case(r#"{"status": "sent"}"#)]
    fn other_shapes_are_transient_errors(#[case] text: &str) {
        assert!(matches!(RawActionResult::parse(text), Err(ActionError::Transient(_))));
    }
}
