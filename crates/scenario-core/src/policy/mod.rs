//!
//! Deterministic decision rules. Nothing in here has side effects beyond
//! logging.
//!

pub mod consistency;

pub use consistency::{ConsistencyChecker, InconsistentState};
