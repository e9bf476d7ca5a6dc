//!
//! Mechanical side effects of a dispatch: the charm root on disk and the
//! process environment. No decisions are made here.
//!

pub mod env;
pub mod vroot;

pub use env::{DispatchEnv, EnvGuard, EnvironmentBuilder};
pub use vroot::VirtualExecutionRoot;
