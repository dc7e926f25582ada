//! App - アプリケーション層
//!
//! ports とコンポーネント（ContactStore, Dispatcher）を組み合わせた
//! 呼び出し側のワークフロー。
//!
//! # 主要コンポーネント
//! - **BatchRunner**: URL リストへの一括送信（冷却・ブロック・日次上限・停止判定）

pub mod batch;

pub use self::batch::{
    BatchEntry, BatchEvent, BatchOptions, BatchReport, BatchRunner, EntryStatus, HaltReason,
    RATE_LIMIT_REASON,
};
