//! Application configuration schemas.
//!
//! The configuration is deserialized from an optional TOML file merged with
//! `CFGD__`-prefixed environment variables via the `config` crate. Each
//! sub-module represents a logical configuration section.

pub mod datastore;
pub mod logging;
pub mod plugin;

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use self::datastore::DatastoreConfig;
pub use self::logging::LoggingConfig;
pub use self::plugin::{PluginConfig, PluginRole};

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Plugin discovery settings.
    #[serde(default)]
    pub plugins: PluginConfig,
    /// Candidate and running datastore locations.
    #[serde(default)]
    pub datastore: DatastoreConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Free-form host options handed to plugins through their handle.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// When `path` is given the file must exist; its format is taken from
    /// the extension. Environment variables such as
    /// `CFGD__PLUGINS__BACKEND_DIR` override file values.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("CFGD")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Looks up a host option. Keys compare case-insensitively.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}
