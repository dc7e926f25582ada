//! Contact keys: the normalized identity of an outreach target.
//!
//! Raw identifiers are profile URLs as users paste them. The same profile
//! shows up with a trailing slash, a tracking query string, or different
//! casing, so every lookup goes through [`normalize`] first.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonicalize a raw target identifier.
///
/// Steps, in order:
/// 1. drop everything from the first `?` onward
/// 2. drop all trailing `/`
/// 3. lowercase the remainder
///
/// Purely textual. Malformed URLs are accepted as-is.
pub fn normalize(raw: &str) -> String {
    let base = match raw.split_once('?') {
        Some((base, _query)) => base,
        None => raw,
    };
    base.trim_end_matches('/').to_lowercase()
}

/// A normalized contact key.
///
/// Construction always normalizes, including deserialization, so a key read
/// back from disk can never disagree with a key built from a raw URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ContactKey(String);

impl ContactKey {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContactKey {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&str> for ContactKey {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<ContactKey> for String {
    fn from(key: ContactKey) -> Self {
        key.0
    }
}

impl AsRef<str> for ContactKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
