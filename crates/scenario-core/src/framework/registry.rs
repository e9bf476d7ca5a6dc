use crate::{
    framework::{Charm, CharmError, EventContext},
    model::event::normalize_name,
};
use std::collections::BTreeMap;

type Handler<C> = Box<dyn FnMut(&mut C, &mut EventContext<'_, '_>) -> Result<(), CharmError>>;

///
/// Observer
///

pub struct Observer<C> {
    method: String,
    handler: Handler<C>,
}

impl<C> Observer<C> {
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    pub(crate) fn call(
        &mut self,
        charm: &mut C,
        ctx: &mut EventContext<'_, '_>,
    ) -> Result<(), CharmError> {
        (self.handler)(charm, ctx)
    }
}

///
/// ObserverRegistry
///
/// Event name to the observers that want it, in registration order.
/// Lives for exactly one dispatch.
///

pub struct ObserverRegistry<C> {
    observers: BTreeMap<String, Vec<Observer<C>>>,
}

impl<C: Charm> ObserverRegistry<C> {
    /// Fresh registry populated by the charm's own `observe`.
    #[must_use]
    pub fn for_charm() -> Self {
        let mut registry = Self::default();
        C::observe(&mut registry);

        registry
    }
}

impl<C> ObserverRegistry<C> {
    /// Register `handler` under the observer name `method`. Dashes in
    /// `event` are folded to underscores.
    pub fn observe<F>(&mut self, event: &str, method: &str, handler: F) -> &mut Self
    where
        F: FnMut(&mut C, &mut EventContext<'_, '_>) -> Result<(), CharmError> + 'static,
    {
        self.observers
            .entry(normalize_name(event))
            .or_default()
            .push(Observer {
                method: method.to_string(),
                handler: Box::new(handler),
            });
        self
    }

    #[must_use]
    pub fn is_observed(&self, event: &str) -> bool {
        self.observers.get(event).is_some_and(|o| !o.is_empty())
    }

    #[must_use]
    pub fn methods(&self, event: &str) -> Vec<&str> {
        self.observers
            .get(event)
            .map(|o| o.iter().map(Observer::method).collect())
            .unwrap_or_default()
    }

    pub(crate) fn observers_mut(&mut self, event: &str) -> &mut [Observer<C>] {
        match self.observers.get_mut(event) {
            Some(observers) => observers.as_mut_slice(),
            None => &mut [],
        }
    }

    pub(crate) fn observer_mut(&mut self, event: &str, method: &str) -> Option<&mut Observer<C>> {
        self.observers
            .get_mut(event)?
            .iter_mut()
            .find(|o| o.method == method)
    }
}

impl<C> Default for ObserverRegistry<C> {
    fn default() -> Self {
        Self {
            observers: BTreeMap::new(),
        }
    }
}

///
/// TESTS
///
