//! Test utilities for dispatching charms through `scenario-core`.
//!
//! Provides deterministic dummy values and the process-wide lock every test
//! that dispatches must hold, since a dispatch writes the process environment.

use scenario_core::model::{
    Model, Relation,
    state::{DataBag, Secret},
};
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize dispatches across test threads.
///
/// A test that failed while holding the lock does not poison later ones.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

///
/// Deterministic dummy-value generator for tests.
///
/// Produces stable model identities, relations and secrets derived from a
/// numeric seed, which keeps scenarios reproducible without hand-written ids.
///

pub struct Fake;

impl Fake {
    #[must_use]
    pub fn model(seed: u32) -> Model {
        Model::new(
            format!("model-{seed}"),
            format!("{seed:08x}-0000-4000-8000-{seed:012x}"),
        )
    }

    /// Relation on `endpoint` with id `seed` and one seeded key in every
    /// remote bag.
    #[must_use]
    pub fn relation(seed: u32, endpoint: &str) -> Relation {
        let bag = Self::data_bag(seed);

        Relation::new(endpoint, seed)
            .with_remote_app_name(format!("remote-{seed}"))
            .with_remote_app_data(bag.clone())
            .with_remote_unit(0, bag)
    }

    #[must_use]
    pub fn secret(seed: u32) -> Secret {
        Secret::new(format!("secret:{seed:020}"), Self::data_bag(seed))
            .with_label(format!("label-{seed}"))
    }

    #[must_use]
    pub fn data_bag(seed: u32) -> DataBag {
        DataBag::from([("seed".to_string(), seed.to_string())])
    }
}

///
/// TESTS
///
