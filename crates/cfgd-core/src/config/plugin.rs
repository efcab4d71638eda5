//! Plugin discovery configuration.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Which side of the system a plugin registry serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginRole {
    /// Backend (configuration daemon) plugins with transaction hooks.
    Backend,
    /// Frontend (interactive CLI) plugins.
    Frontend,
}

impl PluginRole {
    /// Returns the string name of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backend => "backend",
            Self::Frontend => "frontend",
        }
    }
}

impl fmt::Display for PluginRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plugin system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory scanned for backend plugins.
    #[serde(default = "default_backend_dir")]
    pub backend_dir: String,
    /// Directory scanned for frontend plugins.
    #[serde(default = "default_frontend_dir")]
    pub frontend_dir: String,
    /// File extension (without the dot) that marks a loadable unit.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Whether to discover plugins on startup.
    #[serde(default = "default_true")]
    pub auto_load: bool,
}

impl PluginConfig {
    /// Returns the discovery directory for a registry role.
    pub fn directory_for(&self, role: PluginRole) -> &Path {
        match role {
            PluginRole::Backend => Path::new(&self.backend_dir),
            PluginRole::Frontend => Path::new(&self.frontend_dir),
        }
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            backend_dir: default_backend_dir(),
            frontend_dir: default_frontend_dir(),
            extension: default_extension(),
            auto_load: default_true(),
        }
    }
}

fn default_backend_dir() -> String {
    "./plugins/backend".to_string()
}

fn default_frontend_dir() -> String {
    "./plugins/frontend".to_string()
}

fn default_extension() -> String {
    std::env::consts::DLL_EXTENSION.to_string()
}

fn default_true() -> bool {
    true
}
