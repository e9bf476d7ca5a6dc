use crate::{log::Level, model::version::JujuVersion};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error as ThisError;

///
/// ConfigSchemaError
///

#[derive(Debug, ThisError)]
pub enum ConfigSchemaError {
    #[error("validation error: {0}")]
    ValidationError(String),
}

///
/// Validate
///

pub trait Validate {
    fn validate(&self) -> Result<(), ConfigSchemaError>;
}

///
/// Defaults
///

mod defaults {
    pub fn juju_version() -> String {
        super::DEFAULT_JUJU_VERSION.to_string()
    }
}

pub const DEFAULT_JUJU_VERSION: &str = "3.0.0";

///
/// RuntimeConfig
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Controller version the dispatch pretends to run under.
    #[serde(default = "defaults::juju_version")]
    pub juju_version: String,

    /// Custom charm root; a private temporary directory is used when unset.
    #[serde(default)]
    pub charm_root: Option<PathBuf>,

    #[serde(default)]
    pub unit_id: u32,

    /// Overrides the derived `<app>/<unit_id>` unit name.
    #[serde(default)]
    pub unit_name: Option<String>,

    #[serde(default)]
    pub skip_consistency_checks: bool,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            juju_version: defaults::juju_version(),
            charm_root: None,
            unit_id: 0,
            unit_name: None,
            skip_consistency_checks: false,
            log: LogConfig::default(),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub fn with_juju_version(mut self, version: impl Into<String>) -> Self {
        self.juju_version = version.into();
        self
    }

    #[must_use]
    pub fn with_charm_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.charm_root = Some(root.into());
        self
    }

    #[must_use]
    pub fn with_unit_name(mut self, name: impl Into<String>) -> Self {
        self.unit_name = Some(name.into());
        self
    }

    #[must_use]
    pub const fn skipping_consistency_checks(mut self) -> Self {
        self.skip_consistency_checks = true;
        self
    }
}

impl Validate for RuntimeConfig {
    fn validate(&self) -> Result<(), ConfigSchemaError> {
        JujuVersion::parse(&self.juju_version).map_err(|err| {
            ConfigSchemaError::ValidationError(format!("juju_version: {err}"))
        })?;

        if let Some(name) = &self.unit_name {
            let valid = name
                .split_once('/')
                .is_some_and(|(app, id)| !app.is_empty() && id.parse::<u32>().is_ok());
            if !valid {
                return Err(ConfigSchemaError::ValidationError(format!(
                    "unit_name '{name}' must look like '<app>/<number>'"
                )));
            }
        }

        if let Some(root) = &self.charm_root
            && root.as_os_str().is_empty()
        {
            return Err(ConfigSchemaError::ValidationError(
                "charm_root must not be empty".into(),
            ));
        }

        Ok(())
    }
}

///
/// LogConfig
///

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "LogConfig::default_level")]
    pub level: Level,
}

impl LogConfig {
    const fn default_level() -> Level {
        Level::Info
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}
