//!
//! One-call entry point: build the spec, build a runtime, fire the event.
//!

use crate::{
    Error,
    config::RuntimeConfig,
    framework::Charm,
    model::{
        CharmSpec, Event, State,
        spec::{ActionsDoc, CharmMeta, ConfigSchema},
    },
    workflow::{DispatchHooks, Runtime},
};
use std::path::PathBuf;

///
/// TriggerOptions
///

pub struct TriggerOptions<C> {
    pub meta: Option<CharmMeta>,
    pub config: Option<ConfigSchema>,
    pub actions: Option<ActionsDoc>,

    /// Charm source directory to autoload metadata from when none is given.
    pub charm_dir: Option<PathBuf>,

    pub runtime: RuntimeConfig,
    pub hooks: DispatchHooks<C>,
}

impl<C> Default for TriggerOptions<C> {
    fn default() -> Self {
        Self {
            meta: None,
            config: None,
            actions: None,
            charm_dir: None,
            runtime: RuntimeConfig::default(),
            hooks: DispatchHooks::default(),
        }
    }
}

impl<C: Charm> TriggerOptions<C> {
    /// Resolve the charm spec these options describe.
    ///
    /// Explicit documents win; a missing `meta` next to explicit config or
    /// actions defaults to `{name: C::KIND}`. With no documents at all the
    /// spec is autoloaded from `charm_dir`, or falls back to the bare default.
    pub fn charm_spec(&self) -> Result<CharmSpec<C>, Error> {
        let explicit = self.meta.is_some() || self.config.is_some() || self.actions.is_some();

        if !explicit && let Some(dir) = &self.charm_dir {
            return Ok(CharmSpec::autoload(dir)?);
        }

        let mut spec = CharmSpec::new(
            self.meta
                .clone()
                .unwrap_or_else(|| CharmMeta::new(C::KIND)),
        );
        spec.config.clone_from(&self.config);
        spec.actions.clone_from(&self.actions);

        Ok(spec)
    }
}

/// Fire `event` on a fresh `C` against `state` and return the resulting state.
pub fn trigger<C: Charm>(
    state: &State,
    event: impl Into<Event>,
    options: TriggerOptions<C>,
) -> Result<State, Error> {
    let spec = options.charm_spec()?;
    let TriggerOptions { runtime, hooks, .. } = options;

    Runtime::new(spec, runtime)?.exec_with(state, &event.into(), hooks)
}

///
/// TESTS
///
