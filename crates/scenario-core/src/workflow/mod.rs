//!
//! Orchestration. Workflows sequence policy, ops and storage; they own no
//! state of their own beyond one dispatch.
//!

pub mod runtime;

pub use runtime::{DispatchHooks, Runtime};
