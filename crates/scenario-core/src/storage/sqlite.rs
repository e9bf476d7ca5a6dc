use crate::{
    log,
    log::Topic,
    storage::{
        Notice, SnapshotStore, StoreError,
        codec::{decode, encode},
    },
};
use rusqlite::{Connection, OptionalExtension, params};
use serde_cbor::Value;
use std::{path::Path, time::Duration};

/// File name of the unit store inside the charm root.
pub const STORE_FILE: &str = ".unit-state.db";

const BUSY_TIMEOUT: Duration = Duration::from_secs(60 * 60);

///
/// SqliteStore
///
/// Same two-table layout the in-charm framework uses, so a store primed here
/// reads back identically from charm code.
///

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let store = Self { conn };
        store.setup()?;

        Ok(store)
    }

    /// Open the store that lives in `charm_root`.
    pub fn in_root(charm_root: &Path) -> Result<Self, StoreError> {
        Self::open(&charm_root.join(STORE_FILE))
    }

    fn setup(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS snapshot (handle TEXT PRIMARY KEY, data BLOB);
             CREATE TABLE IF NOT EXISTS notice (
                 sequence INTEGER PRIMARY KEY AUTOINCREMENT,
                 event_path TEXT,
                 observer_path TEXT,
                 method_name TEXT);",
        )?;

        Ok(())
    }
}

fn row_to_notice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notice> {
    Ok(Notice {
        event_path: row.get(0)?,
        observer_path: row.get(1)?,
        method_name: row.get(2)?,
    })
}

impl SnapshotStore for SqliteStore {
    fn save_snapshot(&mut self, handle_path: &str, data: &Value) -> Result<(), StoreError> {
        let raw = encode(data)?;
        self.conn.execute(
            "REPLACE INTO snapshot VALUES (?1, ?2)",
            params![handle_path, raw],
        )?;

        Ok(())
    }

    fn load_snapshot(&self, handle_path: &str) -> Result<Value, StoreError> {
        let raw: Option<Vec<u8>> = self
            .conn
            .query_row(
                "SELECT data FROM snapshot WHERE handle = ?1",
                params![handle_path],
                |row| row.get(0),
            )
            .optional()?;

        let raw = raw.ok_or_else(|| StoreError::NoSnapshot(handle_path.to_string()))?;

        Ok(decode(&raw)?)
    }

    fn drop_snapshot(&mut self, handle_path: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM snapshot WHERE handle = ?1",
            params![handle_path],
        )?;

        Ok(())
    }

    fn list_snapshots(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self.conn.prepare("SELECT handle FROM snapshot")?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(handles)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let snapshots = tx.execute("DELETE FROM snapshot", [])?;
        let notices = tx.execute("DELETE FROM notice", [])?;
        tx.commit()?;

        if snapshots + notices > 0 {
            log!(
                Topic::Store,
                Debug,
                "cleared {snapshots} snapshot(s), {notices} notice(s) left by an earlier dispatch"
            );
        }

        Ok(())
    }

    fn save_notice(&mut self, notice: &Notice) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO notice VALUES (NULL, ?1, ?2, ?3)",
            params![notice.event_path, notice.observer_path, notice.method_name],
        )?;

        Ok(())
    }

    fn drop_notice(&mut self, notice: &Notice) -> Result<(), StoreError> {
        self.conn.execute(
            "DELETE FROM notice WHERE event_path = ?1 AND observer_path = ?2 AND method_name = ?3",
            params![notice.event_path, notice.observer_path, notice.method_name],
        )?;

        Ok(())
    }

    fn notices(&self, event_path: Option<&str>) -> Result<Vec<Notice>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_path, observer_path, method_name FROM notice
              WHERE ?1 IS NULL OR event_path = ?1 ORDER BY sequence",
        )?;
        let notices = stmt
            .query_map(params![event_path.filter(|p| !p.is_empty())], row_to_notice)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(notices)
    }

    fn close(self) -> Result<(), StoreError> {
        self.conn.close().map_err(|(_, err)| StoreError::Sqlite(err))
    }
}

///
/// TESTS
///
