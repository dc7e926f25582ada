//! Domain model (keys, records, statuses, outcomes, errors).

pub mod action;
pub mod errors;
pub mod history;
pub mod key;
pub mod outcome;
pub mod record;
pub mod status;

pub use self::action::{ActionError, RawActionResult};
pub use self::errors::{ConfigError, StoreError};
pub use self::history::HistoryEntry;
pub use self::key::{ContactKey, normalize};
pub use self::outcome::{DispatchOutcome, OutcomeKind, SessionStats};
pub use self::record::{ContactRecord, Metadata};
pub use self::status::{CheckResult, ContactStatus, StoreStats};
