//!
//! Value types consumed and produced by a dispatch.
//!

pub mod event;
pub mod spec;
pub mod state;
pub mod version;

pub use event::Event;
pub use spec::{CharmMeta, CharmSpec, ConfigSchema};
pub use state::{
    ConfigValue, Container, DataBag, DeferredEvent, Model, Relation, Secret, State, StoredState,
};
pub use version::JujuVersion;
