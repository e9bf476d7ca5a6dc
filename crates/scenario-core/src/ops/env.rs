//!
//! The process environment a live dispatch would present.
//!
//! Charm code and relation libraries branch on these exact keys and values,
//! so they are spelled the way the controller spells them.
//!

use crate::{
    log,
    log::Topic,
    model::{Event, State},
};
use derive_more::{Deref, DerefMut};
use std::{collections::BTreeMap, io, path::Path};

pub const JUJU_VERSION: &str = "JUJU_VERSION";
pub const JUJU_UNIT_NAME: &str = "JUJU_UNIT_NAME";
pub const DISPATCH_MARKER: &str = "_";
pub const JUJU_DISPATCH_PATH: &str = "JUJU_DISPATCH_PATH";
pub const JUJU_MODEL_NAME: &str = "JUJU_MODEL_NAME";
pub const JUJU_MODEL_UUID: &str = "JUJU_MODEL_UUID";
pub const JUJU_ACTION_NAME: &str = "JUJU_ACTION_NAME";
pub const JUJU_CHARM_DIR: &str = "JUJU_CHARM_DIR";
pub const JUJU_RELATION: &str = "JUJU_RELATION";
pub const JUJU_RELATION_ID: &str = "JUJU_RELATION_ID";
pub const JUJU_WORKLOAD_NAME: &str = "JUJU_WORKLOAD_NAME";
pub const JUJU_SECRET_ID: &str = "JUJU_SECRET_ID";
pub const JUJU_SECRET_LABEL: &str = "JUJU_SECRET_LABEL";

const DISPATCH_MARKER_VALUE: &str = "./dispatch";

///
/// DispatchEnv
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Eq, PartialEq)]
pub struct DispatchEnv(BTreeMap<String, String>);

impl DispatchEnv {
    /// Set every key on the process environment.
    ///
    /// The returned guard unsets the same key set when dropped, so the
    /// variables are gone on every exit path.
    #[must_use = "dropping the guard immediately unsets the environment"]
    pub fn apply(&self) -> EnvGuard {
        for (key, value) in &self.0 {
            // SAFETY: dispatches are single-threaded; nothing else reads or
            // writes the environment while a dispatch is in progress.
            unsafe { std::env::set_var(key, value) };
        }
        log!(Topic::Env, Debug, "applied {} dispatch variable(s)", self.0.len());

        EnvGuard {
            keys: self.0.keys().cloned().collect(),
        }
    }
}

///
/// EnvGuard
///

#[derive(Debug)]
pub struct EnvGuard {
    keys: Vec<String>,
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // SAFETY: see `DispatchEnv::apply`.
            unsafe { std::env::remove_var(key) };
        }
        log!(Topic::Env, Debug, "unset {} dispatch variable(s)", self.keys.len());
    }
}

///
/// EnvironmentBuilder
///

#[derive(Clone, Debug)]
pub struct EnvironmentBuilder {
    juju_version: String,
    unit_name: String,
}

impl EnvironmentBuilder {
    #[must_use]
    pub fn new(juju_version: impl Into<String>, unit_name: impl Into<String>) -> Self {
        Self {
            juju_version: juju_version.into(),
            unit_name: unit_name.into(),
        }
    }

    /// Unit name the controller would assign: `<app>/<unit_id>`.
    #[must_use]
    pub fn derive_unit_name(app: &str, unit_id: u32) -> String {
        format!("{app}/{unit_id}")
    }

    pub fn build(
        &self,
        state: &State,
        event: &Event,
        charm_root: &Path,
    ) -> Result<DispatchEnv, io::Error> {
        let charm_dir = std::path::absolute(charm_root)?;
        let mut env = DispatchEnv::default();

        let mut set = |key: &str, value: String| {
            env.insert(key.to_string(), value);
        };

        set(JUJU_VERSION, self.juju_version.clone());
        set(JUJU_UNIT_NAME, self.unit_name.clone());
        set(DISPATCH_MARKER, DISPATCH_MARKER_VALUE.to_string());
        set(JUJU_DISPATCH_PATH, format!("hooks/{}", event.name));
        set(JUJU_MODEL_NAME, state.model.name.clone());
        set(JUJU_ACTION_NAME, event.action_name().unwrap_or_default());
        set(JUJU_MODEL_UUID, state.model.uuid.clone());
        set(JUJU_CHARM_DIR, charm_dir.display().to_string());

        if let Some(relation) = &event.relation {
            set(JUJU_RELATION, relation.endpoint.clone());
            set(JUJU_RELATION_ID, relation.relation_id.to_string());
        }

        if let Some(container) = &event.container {
            set(JUJU_WORKLOAD_NAME, container.name.clone());
        }

        if let Some(secret) = &event.secret {
            set(JUJU_SECRET_ID, secret.id.clone());
            set(JUJU_SECRET_LABEL, secret.label.clone().unwrap_or_default());
        }

        Ok(env)
    }
}

///
/// TESTS
///
