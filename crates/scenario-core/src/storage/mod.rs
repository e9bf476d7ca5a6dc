//!
//! The unit's durable notice/snapshot store and the bridge between it and
//! the declarative state.
//!
//! Keys are handle paths. Snapshots hold simple-typed payloads; notices
//! record which observer still owes a deferred event a visit.
//!

pub mod bridge;
pub mod codec;
pub mod handle;
pub mod sqlite;

pub use handle::HandlePath;
pub use sqlite::SqliteStore;

use codec::CodecError;
use serde_cbor::Value;
use thiserror::Error as ThisError;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("no snapshot data found for {0} object")]
    NoSnapshot(String),

    #[error("no event sequence number left after {0}")]
    SequenceExhausted(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

///
/// Notice
/// (event handle path, observer path, observer method)
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub event_path: String,
    pub observer_path: String,
    pub method_name: String,
}

impl Notice {
    #[must_use]
    pub fn new(event_path: &str, observer_path: &str, method_name: &str) -> Self {
        Self {
            event_path: event_path.to_string(),
            observer_path: observer_path.to_string(),
            method_name: method_name.to_string(),
        }
    }
}

///
/// SnapshotStore
///

pub trait SnapshotStore {
    /// Persist `data` under `handle_path`, replacing whatever was there.
    fn save_snapshot(&mut self, handle_path: &str, data: &Value) -> Result<(), StoreError>;

    fn load_snapshot(&self, handle_path: &str) -> Result<Value, StoreError>;

    /// Dropping a missing snapshot is a no-op.
    fn drop_snapshot(&mut self, handle_path: &str) -> Result<(), StoreError>;

    fn list_snapshots(&self) -> Result<Vec<String>, StoreError>;

    /// Remove every snapshot and notice.
    fn clear(&mut self) -> Result<(), StoreError>;

    fn save_notice(&mut self, notice: &Notice) -> Result<(), StoreError>;

    fn drop_notice(&mut self, notice: &Notice) -> Result<(), StoreError>;

    /// Notices for `event_path` (all notices when `None`), in insertion order.
    fn notices(&self, event_path: Option<&str>) -> Result<Vec<Notice>, StoreError>;

    fn close(self) -> Result<(), StoreError>
    where
        Self: Sized;
}
