//!
//! The charm root a dispatch runs in.
//!
//! [`VirtualExecutionRoot`] owns the directory for the length of one
//! dispatch and lays down the three metadata documents before handing it
//! out. A private root is a [`tempfile::TempDir`] and disappears on drop,
//! whichever way the dispatch ends; a caller-supplied root is left in place.
//!

use crate::{
    log,
    log::Topic,
    model::spec::{ACTIONS_FILE, CONFIG_FILE, CharmSpec, METADATA_FILE, MetadataError},
};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use thiserror::Error as ThisError;

///
/// ExecutionRootError
///

#[derive(Debug, ThisError)]
pub enum ExecutionRootError {
    #[error("metadata files found in custom charm root {path}")]
    Dirty { path: PathBuf },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("cannot render {document}: {message}")]
    Render { document: String, message: String },
}

impl From<MetadataError> for ExecutionRootError {
    fn from(err: MetadataError) -> Self {
        match err {
            MetadataError::Render { document, message } => Self::Render { document, message },
            MetadataError::Read { source, .. } => Self::Io(source),
            MetadataError::Parse { path, message } => Self::Render {
                document: path.display().to_string(),
                message,
            },
        }
    }
}

///
/// VirtualExecutionRoot
///

#[derive(Debug)]
pub enum VirtualExecutionRoot {
    /// Caller-supplied directory. Kept on drop.
    Custom(PathBuf),

    /// Private directory. Deleted on drop.
    Temporary(TempDir),
}

impl VirtualExecutionRoot {
    /// Acquire a root for `spec` and write its metadata documents into it.
    ///
    /// A custom root that already holds metadata documents is only accepted
    /// when the spec was auto-discovered; caller-supplied metadata would
    /// otherwise silently replace files that may disagree with it.
    pub fn acquire<C>(
        spec: &CharmSpec<C>,
        custom: Option<&Path>,
    ) -> Result<Self, ExecutionRootError> {
        let root = match custom {
            Some(path) => {
                fs::create_dir_all(path)?;
                Self::Custom(path.to_path_buf())
            }
            None => Self::Temporary(tempfile::tempdir()?),
        };

        if root.is_custom() && root.has_metadata_files() {
            if spec.autoloaded {
                log!(
                    Topic::ExecutionRoot,
                    Info,
                    "metadata files found in custom root {}; spec was autoloaded, overwriting",
                    root.path().display()
                );
            } else {
                log!(
                    Topic::ExecutionRoot,
                    Error,
                    "metadata files found in custom root {} while metadata was passed explicitly",
                    root.path().display()
                );
                return Err(ExecutionRootError::Dirty {
                    path: root.path().to_path_buf(),
                });
            }
        }

        root.write_documents(spec)?;

        Ok(root)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Custom(path) => path,
            Self::Temporary(dir) => dir.path(),
        }
    }

    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    fn has_metadata_files(&self) -> bool {
        [METADATA_FILE, CONFIG_FILE, ACTIONS_FILE]
            .iter()
            .any(|file| self.path().join(file).exists())
    }

    fn write_documents<C>(&self, spec: &CharmSpec<C>) -> Result<(), ExecutionRootError> {
        let root = self.path();
        fs::write(root.join(METADATA_FILE), spec.render_metadata()?)?;
        fs::write(root.join(CONFIG_FILE), spec.render_config()?)?;
        fs::write(root.join(ACTIONS_FILE), spec.render_actions()?)?;

        Ok(())
    }
}

///
/// TESTS
///
