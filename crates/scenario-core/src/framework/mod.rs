//!
//! The charm entry point.
//!
//! A charm is a plain Rust type implementing [`Charm`]. For every dispatch a
//! fresh [`ObserverRegistry`] is built from [`Charm::observe`]; nothing is
//! registered at type level, so dispatches never see each other's observers.
//!

pub mod context;
pub mod dispatch;
pub mod registry;

pub use context::{DispatchContext, EventContext, Framework};
pub use dispatch::DispatchHooks;
pub use registry::ObserverRegistry;

use crate::storage::StoreError;
use std::{error::Error as StdError, fmt};
use thiserror::Error as ThisError;

///
/// Charm
///

pub trait Charm: Sized + 'static {
    /// Root of every handle path this charm owns.
    const KIND: &'static str;

    fn observe(registry: &mut ObserverRegistry<Self>);

    fn init(framework: &mut Framework<'_>) -> Result<Self, CharmError>;
}

///
/// CharmError
///
/// What charm code reports when it gives up on an event.
///

#[derive(Debug)]
pub struct CharmError {
    message: String,
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl CharmError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CharmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CharmError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn StdError + 'static))
    }
}

///
/// DispatchError
///

#[derive(Debug, ThisError)]
pub enum DispatchError {
    #[error("no observer registered for '{event}' on '{charm}'")]
    NoObserverRegistered { event: String, charm: String },

    #[error(transparent)]
    Charm(CharmError),

    #[error("dispatch environment variable {key} is unusable: {reason}")]
    Environment { key: String, reason: String },

    #[error("unable to save the data for {handle_path}: {reason}")]
    UnserializablePayload { handle_path: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<CharmError> for DispatchError {
    fn from(err: CharmError) -> Self {
        Self::Charm(err)
    }
}

// lets handlers `?` framework calls such as `stored_state`
impl From<DispatchError> for CharmError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Charm(err) => err,
            other => Self::with_source("framework error", other),
        }
    }
}

///
/// TESTS
///
