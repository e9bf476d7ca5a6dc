//!
//! The declarative world a charm sees for one dispatch.
//!
//! Everything here is a plain value: the runtime clones the input state,
//! lets the charm work on the clone and hands the clone back. Nothing in
//! this module touches the process or the filesystem.
//!

use crate::model::event::{Event, normalize_name};
use serde::{Deserialize, Serialize};
use serde_cbor::Value;
use std::collections::BTreeMap;

pub type DataBag = BTreeMap<String, String>;

pub const DEFAULT_MODEL_NAME: &str = "default";
pub const DEFAULT_MODEL_UUID: &str = "00000000-0000-4000-8000-000000000000";

///
/// State
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct State {
    #[serde(default)]
    pub config: BTreeMap<String, ConfigValue>,

    #[serde(default)]
    pub relations: Vec<Relation>,

    #[serde(default)]
    pub containers: Vec<Container>,

    #[serde(default)]
    pub secrets: Vec<Secret>,

    #[serde(default)]
    pub model: Model,

    #[serde(default)]
    pub leader: bool,

    #[serde(default)]
    pub deferred: Vec<DeferredEvent>,

    #[serde(default)]
    pub stored_state: Vec<StoredState>,
}

impl State {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.containers.push(container);
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secrets.push(secret);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_leader(mut self, leader: bool) -> Self {
        self.leader = leader;
        self
    }

    #[must_use]
    pub fn with_deferred(mut self, deferred: DeferredEvent) -> Self {
        self.deferred.push(deferred);
        self
    }

    #[must_use]
    pub fn with_stored_state(mut self, stored: StoredState) -> Self {
        self.stored_state.push(stored);
        self
    }

    #[must_use]
    pub fn relation(&self, relation_id: u32) -> Option<&Relation> {
        self.relations.iter().find(|r| r.relation_id == relation_id)
    }

    pub fn relation_mut(&mut self, relation_id: u32) -> Option<&mut Relation> {
        self.relations
            .iter_mut()
            .find(|r| r.relation_id == relation_id)
    }

    #[must_use]
    pub fn container(&self, name: &str) -> Option<&Container> {
        self.containers.iter().find(|c| c.name == name)
    }

    #[must_use]
    pub fn secret(&self, id: &str) -> Option<&Secret> {
        self.secrets.iter().find(|s| s.id == id)
    }

    /// Look up a stored-state bag by its full handle path.
    #[must_use]
    pub fn stored(&self, handle_path: &str) -> Option<&StoredState> {
        self.stored_state
            .iter()
            .find(|s| s.handle_path() == handle_path)
    }
}

///
/// ConfigValue
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ConfigValue {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

///
/// Model
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Model {
    pub name: String,
    pub uuid: String,
}

impl Model {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: uuid.into(),
        }
    }
}

impl Default for Model {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME, DEFAULT_MODEL_UUID)
    }
}

///
/// Relation
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Relation {
    pub endpoint: String,
    pub relation_id: u32,

    #[serde(default)]
    pub interface: Option<String>,

    #[serde(default)]
    pub remote_app_name: String,

    #[serde(default)]
    pub local_app_data: DataBag,

    #[serde(default)]
    pub local_unit_data: DataBag,

    #[serde(default)]
    pub remote_app_data: DataBag,

    /// Remote unit number to that unit's data bag.
    #[serde(default)]
    pub remote_units_data: BTreeMap<u32, DataBag>,
}

impl Relation {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, relation_id: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            relation_id,
            remote_app_name: "remote".to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    #[must_use]
    pub fn with_remote_app_name(mut self, name: impl Into<String>) -> Self {
        self.remote_app_name = name.into();
        self
    }

    #[must_use]
    pub fn with_remote_app_data(mut self, data: DataBag) -> Self {
        self.remote_app_data = data;
        self
    }

    #[must_use]
    pub fn with_local_app_data(mut self, data: DataBag) -> Self {
        self.local_app_data = data;
        self
    }

    #[must_use]
    pub fn with_remote_unit(mut self, unit: u32, data: DataBag) -> Self {
        self.remote_units_data.insert(unit, data);
        self
    }

    fn event(&self, suffix: &str) -> Event {
        Event::new(&format!("{}{suffix}", self.endpoint)).with_relation(self.clone())
    }

    #[must_use]
    pub fn created_event(&self) -> Event {
        self.event("_relation_created")
    }

    #[must_use]
    pub fn joined_event(&self) -> Event {
        self.event("_relation_joined")
    }

    #[must_use]
    pub fn changed_event(&self) -> Event {
        self.event("_relation_changed")
    }

    #[must_use]
    pub fn departed_event(&self) -> Event {
        self.event("_relation_departed")
    }

    #[must_use]
    pub fn broken_event(&self) -> Event {
        self.event("_relation_broken")
    }
}

///
/// Container
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Container {
    pub name: String,

    #[serde(default)]
    pub can_connect: bool,
}

impl Container {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            can_connect: false,
        }
    }

    #[must_use]
    pub const fn connectable(mut self) -> Self {
        self.can_connect = true;
        self
    }

    #[must_use]
    pub fn pebble_ready_event(&self) -> Event {
        Event::new(&format!("{}_pebble_ready", self.name)).with_container(self.clone())
    }
}

///
/// Secret
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Secret {
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub contents: DataBag,
}

impl Secret {
    #[must_use]
    pub fn new(id: impl Into<String>, contents: DataBag) -> Self {
        Self {
            id: id.into(),
            label: None,
            contents,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    fn event(&self, name: &str) -> Event {
        Event::new(name).with_secret(self.clone())
    }

    #[must_use]
    pub fn changed_event(&self) -> Event {
        self.event("secret_changed")
    }

    #[must_use]
    pub fn remove_event(&self) -> Event {
        self.event("secret_removed")
    }

    #[must_use]
    pub fn rotate_event(&self) -> Event {
        self.event("secret_rotate")
    }

    #[must_use]
    pub fn expired_event(&self) -> Event {
        self.event("secret_expired")
    }
}

///
/// DeferredEvent
///
/// An event some observer chose to see again on the next dispatch.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DeferredEvent {
    pub handle_path: String,
    pub owner: String,
    pub observer: String,

    #[serde(default = "empty_map")]
    pub snapshot_data: Value,
}

fn empty_map() -> Value {
    Value::Map(BTreeMap::new())
}

impl DeferredEvent {
    /// Build the notice a charm of `owner` kind leaves behind when `observer`
    /// defers `event_name`.
    #[must_use]
    pub fn new(event_name: &str, seq: u64, owner: &str, observer: &str) -> Self {
        Self {
            handle_path: format!("{owner}/on/{}[{seq}]", normalize_name(event_name)),
            owner: owner.to_string(),
            observer: observer.to_string(),
            snapshot_data: empty_map(),
        }
    }

    #[must_use]
    pub fn with_snapshot(mut self, data: Value) -> Self {
        self.snapshot_data = data;
        self
    }
}

///
/// StoredState
///
/// A component's persistent attribute bag, addressed by
/// `(owner_path/)?data_type_name[name]`.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct StoredState {
    #[serde(default)]
    pub owner_path: Option<String>,

    pub data_type_name: String,
    pub name: String,

    #[serde(default)]
    pub content: BTreeMap<String, Value>,
}

pub const STORED_STATE_TYPE_NAME: &str = "StoredStateData";

impl StoredState {
    /// A bag owned by `owner_path` under the default data type.
    #[must_use]
    pub fn new(owner_path: Option<&str>, name: &str) -> Self {
        Self {
            owner_path: owner_path.map(str::to_string),
            data_type_name: STORED_STATE_TYPE_NAME.to_string(),
            name: name.to_string(),
            content: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.content.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn handle_path(&self) -> String {
        match &self.owner_path {
            Some(owner) => format!("{owner}/{}[{}]", self.data_type_name, self.name),
            None => format!("{}[{}]", self.data_type_name, self.name),
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_is_untouched_by_clone_mutation() {
        let state = State::new().with_relation(Relation::new("db", 1));
        let mut working = state.clone();
        working
            .relation_mut(1)
            .expect("relation present")
            .local_app_data
            .insert("k".into(), "v".into());

        assert!(state.relation(1).expect("relation").local_app_data.is_empty());
    }

    #[test]
    fn relation_events_carry_the_relation() {
        let rel = Relation::new("db-admin", 4);
        let evt = rel.changed_event();

        assert_eq!(evt.name, "db_admin_relation_changed");
        assert_eq!(evt.relation.as_ref().map(|r| r.relation_id), Some(4));
    }

    #[test]
    fn pebble_ready_event_names_container() {
        let evt = Container::new("cache").pebble_ready_event();

        assert_eq!(evt.name, "cache_pebble_ready");
        assert_eq!(evt.workload_name(), Some("cache"));
    }

    #[test]
    fn stored_state_handle_path() {
        let owned = StoredState::new(Some("MyCharm"), "_stored");
        let bare = StoredState::new(None, "_stored");

        assert_eq!(owned.handle_path(), "MyCharm/StoredStateData[_stored]");
        assert_eq!(bare.handle_path(), "StoredStateData[_stored]");
    }

    #[test]
    fn deferred_event_handle_path() {
        let evt = DeferredEvent::new("update-status", 7, "MyCharm", "_on_update_status");

        assert_eq!(evt.handle_path, "MyCharm/on/update_status[7]");
        assert_eq!(evt.snapshot_data, Value::Map(BTreeMap::new()));
    }

    #[test]
    fn config_value_kinds() {
        assert_eq!(ConfigValue::from("3").kind_name(), "string");
        assert_eq!(ConfigValue::from(3_i64).kind_name(), "integer");
        assert_eq!(ConfigValue::from(0.5).kind_name(), "number");
        assert_eq!(ConfigValue::from(true).kind_name(), "boolean");
    }
}
