//!
//! The dispatch Runtime: checks, then root, store, environment, charm,
//! drain, in that order. Exactly one of an output state or an error comes
//! out of `exec`; the input state is never touched.
//!

use crate::{
    Error,
    config::{RuntimeConfig, schema::Validate},
    framework::{Charm, dispatch},
    log,
    log::Topic,
    model::{CharmSpec, Event, State},
    ops::{EnvironmentBuilder, VirtualExecutionRoot},
    policy::ConsistencyChecker,
    storage::{SnapshotStore, SqliteStore, bridge},
};
use std::fmt;

pub use crate::framework::DispatchHooks;

///
/// Runtime
///
/// Runs single events against charm type `C`. One dispatch at a time: the
/// process environment is shared, so callers must not run dispatches in
/// parallel.
///

pub struct Runtime<C> {
    spec: CharmSpec<C>,
    config: RuntimeConfig,
}

impl<C> fmt::Debug for Runtime<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("spec", &self.spec)
            .field("config", &self.config)
            .finish()
    }
}

impl<C: Charm> Runtime<C> {
    pub fn new(spec: CharmSpec<C>, config: RuntimeConfig) -> Result<Self, Error> {
        config.validate().map_err(crate::config::ConfigError::from)?;

        Ok(Self { spec, config })
    }

    #[must_use]
    pub const fn spec(&self) -> &CharmSpec<C> {
        &self.spec
    }

    #[must_use]
    pub const fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Unit name the dispatch runs as.
    #[must_use]
    pub fn unit_name(&self) -> String {
        self.config.unit_name.clone().unwrap_or_else(|| {
            EnvironmentBuilder::derive_unit_name(&self.spec.meta.name, self.config.unit_id)
        })
    }

    pub fn exec(&self, state: &State, event: &Event) -> Result<State, Error> {
        self.exec_with(state, event, DispatchHooks::default())
    }

    pub fn exec_with(
        &self,
        state: &State,
        event: &Event,
        mut hooks: DispatchHooks<C>,
    ) -> Result<State, Error> {
        crate::log::set_min_level(self.config.log.level);

        if self.config.consistency_checks_disabled() {
            log!(Topic::Runtime, Warn, "consistency checks are disabled");
        } else {
            ConsistencyChecker::new(state, event, &self.spec, &self.config.juju_version).run()?;
        }

        log!(
            Topic::Runtime,
            Info,
            "preparing to fire '{}' on {}",
            event.name,
            C::KIND
        );

        let mut output = state.clone();

        let root = VirtualExecutionRoot::acquire(&self.spec, self.config.charm_root.as_deref())?;

        let mut store = SqliteStore::in_root(root.path())?;
        bridge::prime(&mut store, state)?;

        let env = EnvironmentBuilder::new(&self.config.juju_version, self.unit_name())
            .build(state, event, root.path())?;
        let guard = env.apply();

        let dispatched = dispatch::dispatch::<C>(&mut output, &mut store, &mut hooks);
        drop(guard);
        dispatched?;

        let (deferred, stored_state) = bridge::drain(&store)?;
        store.close()?;

        output.deferred = deferred;
        output.stored_state = stored_state;

        log!(Topic::Runtime, Ok, "'{}' dispatched on {}", event.name, C::KIND);

        Ok(output)
    }
}
