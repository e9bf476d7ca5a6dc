//!
//! One dispatch through a charm's observer graph.
//!
//! Order: instantiate the charm, run the pre-event hook, re-emit stored
//! notices, emit the dispatched event, run the post-event hook, commit
//! stored state. A handler error or panic aborts the dispatch; nothing after
//! it runs.
//!

use crate::{
    framework::{
        Charm, CharmError, DispatchContext, DispatchError, EventContext, Framework,
        ObserverRegistry,
    },
    log,
    log::Topic,
    model::{
        Event, Relation, State,
        state::{Container, Secret},
    },
    storage::{HandlePath, Notice, SnapshotStore, StoreError},
};
use serde_cbor::Value;
use std::{
    any::Any,
    collections::BTreeMap,
    panic::{AssertUnwindSafe, catch_unwind},
};

const RELATION_NAME: &str = "relation_name";
const RELATION_ID: &str = "relation_id";
const CONTAINER_NAME: &str = "container_name";
const SECRET_ID: &str = "secret_id";
const SECRET_LABEL: &str = "secret_label";

type Hook<C> = Box<dyn FnMut(&C)>;

///
/// DispatchHooks
///
/// Introspection callbacks run right before and right after the event is
/// emitted, each receiving the live charm instance.
///

pub struct DispatchHooks<C> {
    pre_event: Option<Hook<C>>,
    post_event: Option<Hook<C>>,
}

impl<C> DispatchHooks<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_pre_event(mut self, hook: impl FnMut(&C) + 'static) -> Self {
        self.pre_event = Some(Box::new(hook));
        self
    }

    #[must_use]
    pub fn with_post_event(mut self, hook: impl FnMut(&C) + 'static) -> Self {
        self.post_event = Some(Box::new(hook));
        self
    }
}

impl<C> Default for DispatchHooks<C> {
    fn default() -> Self {
        Self {
            pre_event: None,
            post_event: None,
        }
    }
}

/// Dispatch the event named by the process environment to a fresh `C`.
///
/// A panic anywhere in charm code is reported as a charm error.
pub fn dispatch<C: Charm>(
    state: &mut State,
    store: &mut dyn SnapshotStore,
    hooks: &mut DispatchHooks<C>,
) -> Result<(), DispatchError> {
    match catch_unwind(AssertUnwindSafe(|| run::<C>(state, store, hooks))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log!(Topic::Dispatch, Error, "charm code panicked: {message}");

            Err(CharmError::new(format!("charm code panicked: {message}")).into())
        }
    }
}

fn run<C: Charm>(
    state: &mut State,
    store: &mut dyn SnapshotStore,
    hooks: &mut DispatchHooks<C>,
) -> Result<(), DispatchError> {
    let context = DispatchContext::from_env()?;
    let mut registry = ObserverRegistry::<C>::for_charm();

    if !registry.is_observed(&context.event_name) {
        return Err(DispatchError::NoObserverRegistered {
            event: context.event_name,
            charm: C::KIND.to_string(),
        });
    }

    log!(
        Topic::Dispatch,
        Info,
        "dispatching '{}' on {} ({})",
        context.event_name,
        C::KIND,
        context.unit_name
    );

    let mut framework = Framework::new(context, C::KIND, state, store);
    let mut charm = C::init(&mut framework)?;

    if let Some(hook) = hooks.pre_event.as_mut() {
        hook(&charm);
    }

    reemit(&mut charm, &mut registry, &mut framework)?;

    let event = framework.context().event(framework.state());
    emit(&mut charm, &mut registry, &mut framework, &event)?;

    if let Some(hook) = hooks.post_event.as_mut() {
        hook(&charm);
    }

    framework.commit()
}

// Re-deliver every stored notice this charm still has an observer for.
fn reemit<C>(
    charm: &mut C,
    registry: &mut ObserverRegistry<C>,
    framework: &mut Framework<'_>,
) -> Result<(), DispatchError> {
    let notices = framework.store().notices(None)?;

    for notice in notices {
        if notice.observer_path != framework.owner() {
            continue;
        }
        let HandlePath::EventNotice { kind, .. } = HandlePath::parse(&notice.event_path) else {
            log!(
                Topic::Dispatch,
                Warn,
                "notice {} does not address an event; skipping",
                notice.event_path
            );
            continue;
        };
        let Some(observer) = registry.observer_mut(&kind, &notice.method_name) else {
            log!(
                Topic::Dispatch,
                Warn,
                "no observer {} for deferred {}; keeping it",
                notice.method_name,
                notice.event_path
            );
            continue;
        };

        let snapshot = framework.store().load_snapshot(&notice.event_path)?;
        let event = restore_event(&kind, &snapshot, framework.state());

        let mut ctx = EventContext::new(&event, framework);
        observer.call(charm, &mut ctx)?;
        if ctx.is_deferred() {
            log!(Topic::Dispatch, Debug, "{} deferred again", notice.event_path);
            continue;
        }

        let store = framework.store();
        store.drop_notice(&notice)?;
        if store.notices(Some(&notice.event_path))?.is_empty() {
            store.drop_snapshot(&notice.event_path)?;
        }
    }

    Ok(())
}

fn emit<C>(
    charm: &mut C,
    registry: &mut ObserverRegistry<C>,
    framework: &mut Framework<'_>,
    event: &Event,
) -> Result<(), DispatchError> {
    let mut handle_path: Option<String> = None;

    for observer in registry.observers_mut(&event.name) {
        let mut ctx = EventContext::new(event, framework);
        observer.call(charm, &mut ctx)?;
        if !ctx.is_deferred() {
            continue;
        }

        let path = match &handle_path {
            Some(path) => path.clone(),
            None => {
                let path = next_handle_path(framework, &event.name)?;
                framework.store().save_snapshot(&path, &snapshot_of(event))?;
                handle_path = Some(path.clone());
                path
            }
        };

        let notice = Notice::new(&path, framework.owner(), observer.method());
        framework.store().save_notice(&notice)?;
        log!(Topic::Dispatch, Debug, "{} deferred by {}", path, observer.method());
    }

    Ok(())
}

// `<owner>/on/<event>[n]`, n one past the highest sequence in the store
fn next_handle_path(framework: &mut Framework<'_>, event: &str) -> Result<String, DispatchError> {
    let highest = framework
        .store()
        .list_snapshots()?
        .iter()
        .filter_map(|path| match HandlePath::parse(path) {
            HandlePath::EventNotice { seq, .. } => Some(seq.unwrap_or(u64::MAX)),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    let next = highest
        .checked_add(1)
        .ok_or_else(|| StoreError::SequenceExhausted(event.to_string()))?;

    Ok(format!("{}/on/{event}[{next}]", framework.owner()))
}

fn snapshot_of(event: &Event) -> Value {
    let mut map = BTreeMap::new();
    let mut put = |key: &str, value: Value| {
        map.insert(Value::Text(key.to_string()), value);
    };

    if let Some(relation) = &event.relation {
        put(RELATION_NAME, Value::Text(relation.endpoint.clone()));
        put(RELATION_ID, Value::Integer(i128::from(relation.relation_id)));
    } else if let Some(container) = &event.container {
        put(CONTAINER_NAME, Value::Text(container.name.clone()));
    } else if let Some(secret) = &event.secret {
        put(SECRET_ID, Value::Text(secret.id.clone()));
        put(
            SECRET_LABEL,
            secret.label.clone().map_or(Value::Null, Value::Text),
        );
    }

    Value::Map(map)
}

fn restore_event(kind: &str, snapshot: &Value, state: &State) -> Event {
    let mut event = Event::new(kind);
    let Value::Map(map) = snapshot else {
        return event;
    };
    let text = |key: &str| match map.get(&Value::Text(key.to_string())) {
        Some(Value::Text(s)) => Some(s.clone()),
        _ => None,
    };

    if let Some(Value::Integer(id)) = map.get(&Value::Text(RELATION_ID.to_string()))
        && let Ok(id) = u32::try_from(*id)
    {
        event.relation = Some(state.relation(id).cloned().unwrap_or_else(|| {
            Relation::new(text(RELATION_NAME).unwrap_or_default(), id)
        }));
    } else if let Some(name) = text(CONTAINER_NAME) {
        event.container = Some(
            state
                .container(&name)
                .cloned()
                .unwrap_or_else(|| Container::new(name)),
        );
    } else if let Some(id) = text(SECRET_ID) {
        event.secret = Some(state.secret(&id).cloned().unwrap_or_else(|| {
            let secret = Secret::new(id, BTreeMap::new());
            match text(SECRET_LABEL) {
                Some(label) => secret.with_label(label),
                None => secret,
            }
        }));
    }

    event
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

///
/// TESTS
///
