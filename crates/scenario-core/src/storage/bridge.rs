//!
//! Moves deferred events and stored-state bags between a [`State`] and the
//! unit store: `prime` before the charm runs, `drain` after it exits.
//!

use crate::{
    log,
    log::Topic,
    model::{DeferredEvent, State, StoredState},
    storage::{HandlePath, Notice, SnapshotStore, StoreError, codec::ensure_simple},
};
use serde_cbor::Value;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// BridgeError
///

#[derive(Debug, ThisError)]
pub enum BridgeError {
    #[error("unable to save the data for {handle_path}: {reason}")]
    UnserializablePayload { handle_path: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Write every deferred event (snapshot + notice) and every stored-state bag
/// of `state` into `store`. Payloads are checked before anything is written,
/// and whatever the store already held is discarded: the primed store holds
/// exactly what `state` carries.
pub fn prime<S: SnapshotStore>(store: &mut S, state: &State) -> Result<(), BridgeError> {
    for deferred in &state.deferred {
        check_payload(&deferred.handle_path, &deferred.snapshot_data)?;
    }
    let bags = state
        .stored_state
        .iter()
        .map(|bag| {
            let value = content_to_value(&bag.content);
            check_payload(&bag.handle_path(), &value)?;
            Ok((bag.handle_path(), value))
        })
        .collect::<Result<Vec<_>, BridgeError>>()?;

    store.clear()?;

    for deferred in &state.deferred {
        store.save_snapshot(&deferred.handle_path, &deferred.snapshot_data)?;
        store.save_notice(&Notice::new(
            &deferred.handle_path,
            &deferred.owner,
            &deferred.observer,
        ))?;
    }

    for (handle_path, value) in &bags {
        store.save_snapshot(handle_path, value)?;
    }

    log!(
        Topic::Bridge,
        Debug,
        "primed store with {} deferred event(s), {} stored-state bag(s)",
        state.deferred.len(),
        bags.len()
    );

    Ok(())
}

/// Read every deferred event and stored-state bag back out of `store`.
///
/// Deferred events come back in notice order. Snapshot keys that are neither
/// an event notice nor a stored-state bag are logged and skipped.
pub fn drain<S: SnapshotStore>(
    store: &S,
) -> Result<(Vec<DeferredEvent>, Vec<StoredState>), BridgeError> {
    let mut event_paths = BTreeSet::new();
    let mut stored = Vec::new();

    for handle_path in store.list_snapshots()? {
        match HandlePath::parse(&handle_path) {
            HandlePath::EventNotice { .. } => {
                event_paths.insert(handle_path);
            }
            HandlePath::StoredStateEntry {
                owner_path,
                data_type_name,
                name,
            } => {
                let content = value_to_content(&handle_path, store.load_snapshot(&handle_path)?);
                stored.push(StoredState {
                    owner_path,
                    data_type_name,
                    name,
                    content,
                });
            }
            HandlePath::Unrecognized(path) => {
                log!(
                    Topic::Bridge,
                    Warn,
                    "could not pattern-match stored state {path}; skipping"
                );
            }
        }
    }

    let mut deferred = Vec::new();
    for notice in store.notices(None)? {
        if !event_paths.contains(&notice.event_path) {
            continue;
        }
        let snapshot_data = store.load_snapshot(&notice.event_path)?;
        deferred.push(DeferredEvent {
            handle_path: notice.event_path,
            owner: notice.observer_path,
            observer: notice.method_name,
            snapshot_data,
        });
    }

    Ok((deferred, stored))
}

fn check_payload(handle_path: &str, value: &Value) -> Result<(), BridgeError> {
    ensure_simple(value).map_err(|err| BridgeError::UnserializablePayload {
        handle_path: handle_path.to_string(),
        reason: err.to_string(),
    })
}

pub(crate) fn content_to_value(content: &BTreeMap<String, Value>) -> Value {
    Value::Map(
        content
            .iter()
            .map(|(k, v)| (Value::Text(k.clone()), v.clone()))
            .collect(),
    )
}

pub(crate) fn value_to_content(handle_path: &str, value: Value) -> BTreeMap<String, Value> {
    match value {
        Value::Map(entries) => entries
            .into_iter()
            .filter_map(|(k, v)| match k {
                Value::Text(k) => Some((k, v)),
                other => {
                    log!(
                        Topic::Bridge,
                        Warn,
                        "dropping non-text key {other:?} from {handle_path}"
                    );
                    None
                }
            })
            .collect(),
        Value::Null => BTreeMap::new(),
        other => {
            log!(
                Topic::Bridge,
                Warn,
                "snapshot {handle_path} is not a map ({other:?}); treating as empty"
            );
            BTreeMap::new()
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    fn relation_payload() -> Value {
        let mut map = BTreeMap::new();
        map.insert(Value::Text("relation_name".into()), Value::Text("db".into()));
        map.insert(Value::Text("relation_id".into()), Value::Integer(3));
        Value::Map(map)
    }

    #[test]
    fn prime_then_drain_preserves_deferred_and_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::in_root(dir.path()).expect("open");

        let state = State::new()
            .with_deferred(
                DeferredEvent::new("db_relation_changed", 2, "MyCharm", "_on_db_changed")
                    .with_snapshot(relation_payload()),
            )
            .with_deferred(DeferredEvent::new("start", 1, "MyCharm", "_on_start"))
            .with_stored_state(
                StoredState::new(Some("MyCharm"), "_stored")
                    .with_entry("count", Value::Integer(4))
                    .with_entry("names", Value::Array(vec![Value::Text("a".into())])),
            );

        prime(&mut store, &state).expect("prime");
        let (deferred, stored) = drain(&store).expect("drain");

        assert_eq!(deferred, state.deferred);
        assert_eq!(stored, state.stored_state);
    }

    #[test]
    fn unserializable_payload_writes_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::in_root(dir.path()).expect("open");

        let state = State::new()
            .with_deferred(DeferredEvent::new("start", 1, "MyCharm", "_on_start"))
            .with_stored_state(
                StoredState::new(Some("MyCharm"), "_stored")
                    .with_entry("bad", Value::Tag(0, Box::new(Value::Null))),
            );

        let err = prime(&mut store, &state).unwrap_err();

        assert!(matches!(
            err,
            BridgeError::UnserializablePayload { ref handle_path, .. }
                if handle_path == "MyCharm/StoredStateData[_stored]"
        ));
        assert!(store.list_snapshots().expect("list").is_empty());
    }

    #[test]
    fn prime_discards_what_the_store_already_held() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::in_root(dir.path()).expect("open");
        store
            .save_snapshot("MyCharm/StoredStateData[_stored]", &Value::Map(BTreeMap::new()))
            .expect("save");
        store
            .save_notice(&Notice::new("MyCharm/on/start[1]", "MyCharm", "_on_start"))
            .expect("save notice");
        store
            .save_snapshot("MyCharm/on/start[1]", &Value::Map(BTreeMap::new()))
            .expect("save");

        prime(&mut store, &State::new()).expect("prime");
        let (deferred, stored) = drain(&store).expect("drain");

        assert!(deferred.is_empty());
        assert!(stored.is_empty());
    }

    #[test]
    fn unrecognized_keys_are_skipped() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::in_root(dir.path()).expect("open");
        store.save_snapshot("not-a-handle", &Value::Null).expect("save");

        let (deferred, stored) = drain(&store).expect("drain");

        assert!(deferred.is_empty());
        assert!(stored.is_empty());
    }

    #[test]
    fn event_snapshot_without_notice_is_not_returned() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = SqliteStore::in_root(dir.path()).expect("open");
        store
            .save_snapshot("MyCharm/on/start[1]", &Value::Map(BTreeMap::new()))
            .expect("save");

        let (deferred, _) = drain(&store).expect("drain");

        assert!(deferred.is_empty());
    }
}
