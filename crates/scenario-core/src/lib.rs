//! Single-dispatch runtime for charms.
//!
//! `scenario-core` executes exactly one lifecycle event against charm code,
//! given a complete declarative [`State`](model::State) snapshot, and returns
//! the state as the charm left it. No controller process is involved: the
//! runtime rebuilds the process environment, the charm root on disk and the
//! unit's notice/snapshot store that a live dispatch would present.
//!
//! ## Layering
//!
//! - `model/` owns the value types (state, events, charm metadata, versions).
//! - `policy/` owns deterministic decision rules (pre-flight consistency).
//! - `ops/` provides mechanical side effects (charm root, process env).
//! - `storage/` owns the durable store and the bridge to/from `State`.
//! - `framework/` is the charm entry point (observers, deferral, stored state).
//! - `workflow/` orchestrates a dispatch end to end.
//!
//! The default flow is: api → workflow → policy → ops/storage → framework.

pub mod api;
pub mod config;
pub mod error;
pub mod framework;
pub mod log;
pub mod model;
pub mod ops;
pub mod policy;
pub mod storage;
pub mod workflow;

pub use error::{Error, ErrorClass};
pub use framework::{Charm, CharmError, EventContext, Framework, ObserverRegistry};
pub use model::{CharmSpec, DeferredEvent, Event, State, StoredState};
pub use workflow::runtime::{DispatchHooks, Runtime};

///
/// Crate Version
///

pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
