use crate::{
    config::ConfigError,
    framework::{CharmError, DispatchError},
    model::{spec::MetadataError, version::VersionError},
    ops::vroot::ExecutionRootError,
    policy::consistency::InconsistentState,
    storage::{StoreError, bridge::BridgeError},
};
use derive_more::Display;
use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// Error
///
/// Everything a dispatch can fail with. Exactly one of {output state, error}
/// comes out of `Runtime::exec`; an `Error` never carries a partial state.
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    InconsistentState(#[from] InconsistentState),

    #[error(
        "metadata files found in custom charm root {path}; pass either explicit metadata or a clean root, not both"
    )]
    DirtyExecutionRoot { path: PathBuf },

    #[error("uncaught error in charm code: {source}")]
    UncaughtCharm {
        #[source]
        source: CharmError,
    },

    #[error("cannot fire '{event}' on '{charm}': no observer registered for this event")]
    NoObserverRegistered { event: String, charm: String },

    #[error("unable to save the data for {handle_path}, it must contain only simple types: {reason}")]
    UnserializablePayload { handle_path: String, reason: String },

    #[error("dispatch environment variable {key} is unusable: {reason}")]
    DispatchEnvironment { key: String, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::InconsistentState(_) => ErrorClass::Consistency,
            Self::DirtyExecutionRoot { .. }
            | Self::UnserializablePayload { .. }
            | Self::Config(_)
            | Self::Version(_)
            | Self::Metadata(_) => ErrorClass::Setup,
            Self::UncaughtCharm { .. } => ErrorClass::Charm,
            Self::NoObserverRegistered { .. } => ErrorClass::Usage,
            Self::DispatchEnvironment { .. } | Self::Store(_) | Self::Io(_) => ErrorClass::Infra,
        }
    }

    /// Pre-flight diagnostics, if this is an inconsistency error.
    #[must_use]
    pub fn diagnostics(&self) -> Option<&[String]> {
        match self {
            Self::InconsistentState(err) => Some(err.diagnostics()),
            _ => None,
        }
    }
}

impl From<ExecutionRootError> for Error {
    fn from(err: ExecutionRootError) -> Self {
        match err {
            ExecutionRootError::Dirty { path } => Self::DirtyExecutionRoot { path },
            ExecutionRootError::Io(err) => Self::Io(err),
            ExecutionRootError::Render { document, message } => {
                Self::Metadata(MetadataError::Render { document, message })
            }
        }
    }
}

impl From<BridgeError> for Error {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::UnserializablePayload {
                handle_path,
                reason,
            } => Self::UnserializablePayload {
                handle_path,
                reason,
            },
            BridgeError::Store(err) => Self::Store(err),
        }
    }
}

impl From<DispatchError> for Error {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::NoObserverRegistered { event, charm } => {
                Self::NoObserverRegistered { event, charm }
            }
            DispatchError::Charm(source) => Self::UncaughtCharm { source },
            DispatchError::Environment { key, reason } => Self::DispatchEnvironment { key, reason },
            DispatchError::UnserializablePayload {
                handle_path,
                reason,
            } => Self::UnserializablePayload {
                handle_path,
                reason,
            },
            DispatchError::Store(err) => Self::Store(err),
        }
    }
}

///
/// ErrorClass
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum ErrorClass {
    Charm,
    Consistency,
    Infra,
    Setup,
    Usage,
}

///
/// TESTS
///
