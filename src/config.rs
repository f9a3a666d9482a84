//! Configuration System
//!
//! Layered configuration for the logging pipeline. Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. A TOML file (optional)
//! 3. `CONTEXTDATA_*` environment variables, `__` separating nested keys
//!    (e.g. `CONTEXTDATA_LOGGING__LEVEL=debug`)

use crate::error::ContextError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CONTEXTDATA";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextDataConfig {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ContextDataConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ContextError> {
        self.logging.validate()
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml(&self) -> Result<String, ContextError> {
        toml::to_string_pretty(self).map_err(|e| {
            ContextError::InvalidLogging(format!("Failed to serialize configuration: {}", e))
        })
    }
}

/// Loads [`ContextDataConfig`] from its sources
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration, reading `path` if given and present
    pub fn load(path: Option<&Path>) -> Result<ContextDataConfig, ContextError> {
        let mut builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.format", "text")?
            .set_default("logging.output", "stdout")?;

        if let Some(path) = path {
            if path.exists() {
                debug!(config_path = %path.display(), "Loading configuration file");
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            } else {
                warn!(
                    config_path = %path.display(),
                    "Configuration file not found, using defaults"
                );
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let config: ContextDataConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}
