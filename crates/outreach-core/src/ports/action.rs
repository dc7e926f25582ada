//! OutreachAction port - 外部アクション（ブラウザ自動化など）の境界
//!
//! 「URL を開いて操作し、結果を返す」だけを要求する。実装は CLI 側の
//! サブプロセス実行や、テストのクロージャなど。

use crate::domain::{ActionError, RawActionResult};

pub trait OutreachAction {
    /// Perform the action once against `url` with `payload` (the rendered message).
    fn perform(&mut self, url: &str, payload: &str) -> Result<RawActionResult, ActionError>;
}

impl<F> OutreachAction for F
where
    F: FnMut(&str, &str) -> Result<RawActionResult, ActionError>,
{
    fn perform(&mut self, url: &str, payload: &str) -> Result<RawActionResult, ActionError> {
        self(url, payload)
    }
}
