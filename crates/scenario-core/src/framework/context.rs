use crate::{
    framework::DispatchError,
    model::{
        Event, Relation, State,
        state::{Container, STORED_STATE_TYPE_NAME, Secret},
    },
    ops::env::{
        JUJU_ACTION_NAME, JUJU_CHARM_DIR, JUJU_DISPATCH_PATH, JUJU_MODEL_NAME, JUJU_MODEL_UUID,
        JUJU_RELATION, JUJU_RELATION_ID, JUJU_SECRET_ID, JUJU_SECRET_LABEL, JUJU_UNIT_NAME,
        JUJU_VERSION, JUJU_WORKLOAD_NAME,
    },
    storage::{
        SnapshotStore, StoreError,
        bridge::{content_to_value, value_to_content},
        codec::ensure_simple,
    },
};
use serde_cbor::Value;
use std::{collections::BTreeMap, env, path::PathBuf};

///
/// DispatchContext
///
/// The dispatch as the charm learns about it: from the process environment.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DispatchContext {
    pub juju_version: String,
    pub unit_name: String,
    pub event_name: String,
    pub model_name: String,
    pub model_uuid: String,
    pub charm_dir: PathBuf,
    pub action_name: Option<String>,
    pub relation: Option<(String, u32)>,
    pub workload_name: Option<String>,
    pub secret: Option<(String, Option<String>)>,
}

impl DispatchContext {
    pub fn from_env() -> Result<Self, DispatchError> {
        let dispatch_path = required(JUJU_DISPATCH_PATH)?;
        let event_name = dispatch_path
            .strip_prefix("hooks/")
            .ok_or_else(|| DispatchError::Environment {
                key: JUJU_DISPATCH_PATH.to_string(),
                reason: format!("'{dispatch_path}' is not a hooks/ path"),
            })?
            .to_string();

        let relation = match optional(JUJU_RELATION) {
            Some(endpoint) => {
                let raw = required(JUJU_RELATION_ID)?;
                let id = raw.parse().map_err(|_| DispatchError::Environment {
                    key: JUJU_RELATION_ID.to_string(),
                    reason: format!("'{raw}' is not a relation id"),
                })?;
                Some((endpoint, id))
            }
            None => None,
        };

        let secret = optional(JUJU_SECRET_ID)
            .map(|id| (id, optional(JUJU_SECRET_LABEL).filter(|l| !l.is_empty())));

        Ok(Self {
            juju_version: required(JUJU_VERSION)?,
            unit_name: required(JUJU_UNIT_NAME)?,
            event_name,
            model_name: required(JUJU_MODEL_NAME)?,
            model_uuid: required(JUJU_MODEL_UUID)?,
            charm_dir: PathBuf::from(required(JUJU_CHARM_DIR)?),
            action_name: optional(JUJU_ACTION_NAME).filter(|a| !a.is_empty()),
            relation,
            workload_name: optional(JUJU_WORKLOAD_NAME),
            secret,
        })
    }

    /// Materialize the event being dispatched, resolving its references
    /// against `state`.
    #[must_use]
    pub fn event(&self, state: &State) -> Event {
        let mut event = Event::new(&self.event_name);

        if let Some((endpoint, id)) = &self.relation {
            event.relation = Some(
                state
                    .relation(*id)
                    .cloned()
                    .unwrap_or_else(|| Relation::new(endpoint.as_str(), *id)),
            );
        }
        if let Some(name) = &self.workload_name {
            event.container = Some(
                state
                    .container(name)
                    .cloned()
                    .unwrap_or_else(|| Container::new(name.as_str())),
            );
        }
        if let Some((id, label)) = &self.secret {
            event.secret = Some(state.secret(id).cloned().unwrap_or_else(|| {
                let secret = Secret::new(id.as_str(), BTreeMap::new());
                match label {
                    Some(label) => secret.with_label(label.as_str()),
                    None => secret,
                }
            }));
        }

        event
    }
}

fn required(key: &str) -> Result<String, DispatchError> {
    env::var(key).map_err(|err| DispatchError::Environment {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok()
}

///
/// Framework
///
/// What charm code can reach during a dispatch: the context, the working
/// state and its own stored-state bags.
///

pub struct Framework<'a> {
    context: DispatchContext,
    owner: &'static str,
    state: &'a mut State,
    store: &'a mut dyn SnapshotStore,
    stored: BTreeMap<String, BTreeMap<String, Value>>,
}

impl<'a> Framework<'a> {
    pub(crate) fn new(
        context: DispatchContext,
        owner: &'static str,
        state: &'a mut State,
        store: &'a mut dyn SnapshotStore,
    ) -> Self {
        Self {
            context,
            owner,
            state,
            store,
            stored: BTreeMap::new(),
        }
    }

    #[must_use]
    pub const fn context(&self) -> &DispatchContext {
        &self.context
    }

    #[must_use]
    pub fn state(&self) -> &State {
        &*self.state
    }

    #[must_use]
    pub fn is_leader(&self) -> bool {
        self.state.leader
    }

    /// This unit's side of a relation, for writing local data.
    pub fn relation_mut(&mut self, relation_id: u32) -> Option<&mut Relation> {
        self.state.relation_mut(relation_id)
    }

    /// The charm's stored-state bag called `name`, loaded on first use.
    pub fn stored_state(
        &mut self,
        name: &str,
    ) -> Result<&mut BTreeMap<String, Value>, DispatchError> {
        let handle_path = self.stored_handle_path(name);

        if !self.stored.contains_key(&handle_path) {
            let content = match self.store.load_snapshot(&handle_path) {
                Ok(value) => value_to_content(&handle_path, value),
                Err(StoreError::NoSnapshot(_)) => BTreeMap::new(),
                Err(err) => return Err(err.into()),
            };
            self.stored.insert(handle_path.clone(), content);
        }

        Ok(self.stored.entry(handle_path).or_default())
    }

    fn stored_handle_path(&self, name: &str) -> String {
        format!("{}/{STORED_STATE_TYPE_NAME}[{name}]", self.owner)
    }

    pub(crate) const fn owner(&self) -> &'static str {
        self.owner
    }

    pub(crate) fn store(&mut self) -> &mut dyn SnapshotStore {
        &mut *self.store
    }

    /// Write every loaded bag back to the store.
    pub(crate) fn commit(&mut self) -> Result<(), DispatchError> {
        for (handle_path, content) in &self.stored {
            let value = content_to_value(content);
            ensure_simple(&value).map_err(|err| DispatchError::UnserializablePayload {
                handle_path: handle_path.clone(),
                reason: err.to_string(),
            })?;
            self.store.save_snapshot(handle_path, &value)?;
        }

        Ok(())
    }
}

///
/// EventContext
///
/// Handed to an observer alongside the charm. Calling [`defer`](Self::defer)
/// keeps the event around for the next dispatch.
///

pub struct EventContext<'a, 'f> {
    event: &'a Event,
    framework: &'a mut Framework<'f>,
    deferred: bool,
}

impl<'a, 'f> EventContext<'a, 'f> {
    pub(crate) const fn new(event: &'a Event, framework: &'a mut Framework<'f>) -> Self {
        Self {
            event,
            framework,
            deferred: false,
        }
    }

    #[must_use]
    pub const fn event(&self) -> &Event {
        self.event
    }

    pub const fn defer(&mut self) {
        self.deferred = true;
    }

    #[must_use]
    pub const fn is_deferred(&self) -> bool {
        self.deferred
    }

    pub fn framework(&mut self) -> &mut Framework<'f> {
        &mut *self.framework
    }

    #[must_use]
    pub fn state(&self) -> &State {
        self.framework.state()
    }
}
