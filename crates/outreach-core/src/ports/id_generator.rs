//! IdGenerator port - バッチ実行 ID の生成
//!
//! 実行ログ (`run_<id>.json`) とストアのメタデータにこの ID を残すことで、
//! どの実行で送ったかを後から辿れる。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース。Clock から時刻を取るのでテストで決定的にできる

use std::fmt;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::ports::Clock;

/// Batch run identifier. Sorts by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Ulid);

impl RunId {
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for RunId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

pub trait IdGenerator: Send + Sync {
    fn generate_run_id(&self) -> RunId;
}

pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_run_id(&self) -> RunId {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        RunId(Ulid::from_parts(timestamp_ms, rand::random()))
    }
}
