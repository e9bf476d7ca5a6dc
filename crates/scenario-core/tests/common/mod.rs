// Fixture charms shared by the integration tests.
#![allow(dead_code)]

use scenario_core::{
    Charm, CharmError, CharmSpec, EventContext, Framework, ObserverRegistry,
    model::{CharmMeta, ConfigSchema},
};
use serde_cbor::Value;

pub const DISPATCH_KEYS: [&str; 8] = [
    "JUJU_VERSION",
    "JUJU_UNIT_NAME",
    "_",
    "JUJU_DISPATCH_PATH",
    "JUJU_MODEL_NAME",
    "JUJU_MODEL_UUID",
    "JUJU_ACTION_NAME",
    "JUJU_CHARM_DIR",
];

pub fn no_dispatch_env() -> bool {
    DISPATCH_KEYS
        .iter()
        .chain(["JUJU_RELATION", "JUJU_RELATION_ID", "JUJU_WORKLOAD_NAME"].iter())
        .all(|key| std::env::var(key).is_err())
}

fn bump(ctx: &mut EventContext<'_, '_>, key: &str) -> Result<i128, CharmError> {
    let bag = ctx.framework().stored_state("_stored")?;
    let next = match bag.get(key) {
        Some(Value::Integer(n)) => n + 1,
        _ => 1,
    };
    bag.insert(key.to_string(), Value::Integer(next));

    Ok(next)
}

///
/// Recorder
/// copies what it sees into local relation data and stored state
///

pub struct Recorder {
    pub unit_name: String,
}

impl Recorder {
    fn on_start(&mut self, ctx: &mut EventContext<'_, '_>) -> Result<(), CharmError> {
        bump(ctx, "start")?;
        Ok(())
    }

    fn on_db_changed(&mut self, ctx: &mut EventContext<'_, '_>) -> Result<(), CharmError> {
        let relation = ctx
            .event()
            .relation
            .clone()
            .ok_or_else(|| CharmError::new("relation event without relation"))?;
        let seen = relation
            .remote_app_data
            .get("seed")
            .cloned()
            .unwrap_or_default();

        let local = ctx
            .framework()
            .relation_mut(relation.relation_id)
            .ok_or_else(|| CharmError::new("relation missing from state"))?;
        local.local_app_data.insert("seen".into(), seen);

        bump(ctx, "db_changed")?;
        Ok(())
    }

    fn on_cache_ready(&mut self, ctx: &mut EventContext<'_, '_>) -> Result<(), CharmError> {
        let name = ctx
            .framework()
            .context()
            .workload_name
            .clone()
            .unwrap_or_default();
        let bag = ctx.framework().stored_state("_stored")?;
        bag.insert("workload".into(), Value::Text(name));

        Ok(())
    }

    fn on_config_changed(&mut self, ctx: &mut EventContext<'_, '_>) -> Result<(), CharmError> {
        bump(ctx, "config_changed")?;
        Ok(())
    }
}

impl Charm for Recorder {
    const KIND: &'static str = "recorder";

    fn observe(registry: &mut ObserverRegistry<Self>) {
        registry
            .observe("start", "_on_start", Self::on_start)
            .observe("db-relation-changed", "_on_db_changed", Self::on_db_changed)
            .observe("cache-pebble-ready", "_on_cache_ready", Self::on_cache_ready)
            .observe("config-changed", "_on_config_changed", Self::on_config_changed);
    }

    fn init(framework: &mut Framework<'_>) -> Result<Self, CharmError> {
        Ok(Self {
            unit_name: framework.context().unit_name.clone(),
        })
    }
}

pub fn recorder_spec() -> CharmSpec<Recorder> {
    CharmSpec::new(
        CharmMeta::new("recorder")
            .with_requires("db", "pgsql")
            .with_container("cache"),
    )
    .with_config(
        ConfigSchema::default()
            .with_option("replicas", "int")
            .with_option("name", "string"),
    )
}

///
/// Deferrer
/// defers update-status until config says `release`
///

pub struct Deferrer;

impl Deferrer {
    fn on_update_status(&mut self, ctx: &mut EventContext<'_, '_>) -> Result<(), CharmError> {
        bump(ctx, "runs")?;

        let released = matches!(
            ctx.state().config.get("release"),
            Some(scenario_core::model::ConfigValue::Bool(true))
        );
        if !released {
            ctx.defer();
        }

        Ok(())
    }
}

impl Charm for Deferrer {
    const KIND: &'static str = "deferrer";

    fn observe(registry: &mut ObserverRegistry<Self>) {
        registry.observe("update-status", "_on_update_status", Self::on_update_status);
    }

    fn init(_: &mut Framework<'_>) -> Result<Self, CharmError> {
        Ok(Self)
    }
}

pub fn deferrer_spec() -> CharmSpec<Deferrer> {
    CharmSpec::new(CharmMeta::new("deferrer"))
        .with_config(ConfigSchema::default().with_option("release", "boolean"))
}

///
/// Faulty
/// `start` fails, `install` panics, nothing else is observed
///

pub struct Faulty;

impl Charm for Faulty {
    const KIND: &'static str = "faulty";

    fn observe(registry: &mut ObserverRegistry<Self>) {
        registry
            .observe("start", "_on_start", |_, _| {
                Err(CharmError::with_source(
                    "cannot start workload",
                    std::io::Error::other("disk full"),
                ))
            })
            .observe("install", "_on_install", |_, _| panic!("install exploded"));
    }

    fn init(_: &mut Framework<'_>) -> Result<Self, CharmError> {
        Ok(Self)
    }
}

pub fn faulty_spec() -> CharmSpec<Faulty> {
    CharmSpec::new(CharmMeta::new("faulty"))
}
