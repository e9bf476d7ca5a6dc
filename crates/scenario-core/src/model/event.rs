use crate::model::state::{Container, Relation, Secret};
use serde::{Deserialize, Serialize};

pub const RELATION_EVENT_SUFFIXES: [&str; 5] = [
    "_relation_created",
    "_relation_joined",
    "_relation_changed",
    "_relation_departed",
    "_relation_broken",
];
pub const PEBBLE_READY_SUFFIX: &str = "_pebble_ready";
pub const ACTION_SUFFIX: &str = "_action";
pub const SECRET_EVENTS: [&str; 4] = [
    "secret_changed",
    "secret_removed",
    "secret_rotate",
    "secret_expired",
];

/// Event and endpoint names are compared with dashes folded to underscores.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.replace('-', "_")
}

#[must_use]
pub fn is_relation_event(name: &str) -> bool {
    RELATION_EVENT_SUFFIXES.iter().any(|s| name.ends_with(s))
}

#[must_use]
pub fn is_workload_event(name: &str) -> bool {
    name.ends_with(PEBBLE_READY_SUFFIX)
}

#[must_use]
pub fn is_secret_event(name: &str) -> bool {
    SECRET_EVENTS.contains(&name)
}

#[must_use]
pub fn is_action_event(name: &str) -> bool {
    name.ends_with(ACTION_SUFFIX)
}

///
/// Event
///
/// The trigger of a dispatch: a normalized name plus whatever entity the
/// controller would name alongside it.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Event {
    pub name: String,

    #[serde(default)]
    pub relation: Option<Relation>,

    #[serde(default)]
    pub container: Option<Container>,

    #[serde(default)]
    pub secret: Option<Secret>,
}

impl Event {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    #[must_use]
    pub fn with_container(mut self, container: Container) -> Self {
        self.container = Some(container);
        self
    }

    #[must_use]
    pub fn with_secret(mut self, secret: Secret) -> Self {
        self.secret = Some(secret);
        self
    }

    #[must_use]
    pub fn is_relation_event(&self) -> bool {
        is_relation_event(&self.name)
    }

    #[must_use]
    pub fn is_workload_event(&self) -> bool {
        is_workload_event(&self.name)
    }

    #[must_use]
    pub fn is_secret_event(&self) -> bool {
        is_secret_event(&self.name)
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        is_action_event(&self.name)
    }

    /// Container named by a workload event, read off the event name.
    #[must_use]
    pub fn workload_name(&self) -> Option<&str> {
        self.name.strip_suffix(PEBBLE_READY_SUFFIX)
    }

    /// Action name as the controller spells it: suffix stripped, dashes restored.
    #[must_use]
    pub fn action_name(&self) -> Option<String> {
        self.name
            .strip_suffix(ACTION_SUFFIX)
            .map(|name| name.replace('_', "-"))
    }
}

impl From<&str> for Event {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

///
/// TESTS
///
