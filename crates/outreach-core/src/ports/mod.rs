//! Ports - 抽象化レイヤー
//!
//! 外部要因（時刻、待機、外部アクション、ID 生成）を trait で切り出し、
//! コアのロジックをテストで決定的に動かせるようにする。

pub mod action;
pub mod clock;
pub mod id_generator;
pub mod sleeper;

pub use self::action::OutreachAction;
pub use self::clock::{Clock, ManualClock, SystemClock, from_epoch_secs};
pub use self::id_generator::{IdGenerator, RunId, UlidGenerator};
pub use self::sleeper::{RecordingSleeper, Sleeper, ThreadSleeper};
