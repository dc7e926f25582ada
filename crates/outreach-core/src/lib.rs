//! outreach-core
//!
//! Core building blocks for rate-limited outreach: a durable contact store
//! with cooldowns and blocks, and a retrying dispatcher around an external
//! action.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（key, record, status, action, outcome, history, errors）
//! - **ports**: 抽象化レイヤー（Clock, Sleeper, OutreachAction, IdGenerator）
//! - **store**: ContactStore（冷却期間・ブロック・履歴の永続化）
//! - **dispatch**: Dispatcher（リトライ・バックオフ・結果分類）
//! - **app**: BatchRunner（store と dispatcher を組み合わせる一括送信）
//! - **template**: メッセージテンプレートと URL リストの読み込み
//! - **config**: `config.toml` と環境変数による上書き
//! - **observability**: tracing subscriber の初期化

pub mod app;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod observability;
pub mod ports;
pub mod store;
pub mod template;

pub use crate::app::{BatchOptions, BatchReport, BatchRunner};
pub use crate::config::OutreachConfig;
pub use crate::dispatch::{BackoffSchedule, DefaultClassifier, Dispatcher, DispatcherBuilder};
pub use crate::domain::{
    ActionError, CheckResult, ConfigError, ContactKey, ContactStatus, DispatchOutcome,
    OutcomeKind, RawActionResult, StoreError, normalize,
};
pub use crate::store::ContactStore;
