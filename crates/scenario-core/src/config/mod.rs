pub mod schema;

use schema::{ConfigSchemaError, Validate};
use thiserror::Error as ThisError;

pub use schema::{LogConfig, RuntimeConfig};

/// Process-wide opt-out for pre-flight consistency checks.
pub const SKIP_CONSISTENCY_ENV: &str = "SCENARIO_SKIP_CONSISTENCY_CHECKS";

/// Errors related to runtime configuration parsing.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    /// TOML could not be parsed into the expected structure.
    #[error("toml error: {0}")]
    CannotParseToml(String),

    /// Wrapper for data schema-level errors.
    #[error(transparent)]
    ConfigSchema(#[from] ConfigSchemaError),
}

impl RuntimeConfig {
    /// Parse and validate a runtime configuration from a TOML string.
    pub fn from_toml(config_str: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(config_str).map_err(|e| ConfigError::CannotParseToml(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Return the configuration as a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::CannotParseToml(e.to_string()))
    }

    /// True when checks are disabled by config or by the process env opt-out.
    #[must_use]
    pub fn consistency_checks_disabled(&self) -> bool {
        self.skip_consistency_checks
            || std::env::var_os(SKIP_CONSISTENCY_ENV).is_some_and(|v| !v.is_empty())
    }
}

///
/// TESTS
///
