//! Host context shared with plugins, and the per-plugin handle passed to hooks.

use std::sync::Arc;

use cfgd_core::config::AppConfig;

use crate::dependency::entry::{DependencyCallback, DependencyKind};
use crate::dependency::table::DependencyTable;
use crate::error::PluginError;
use crate::registry::PluginRegistry;
use crate::transaction::context::SnapshotRef;

/// Everything the host exposes to plugins: its options, the plugin
/// registry, and the dependency table.
#[derive(Debug)]
pub struct PluginHost {
    /// Host configuration and option table.
    config: Arc<AppConfig>,
    /// Registry the plugins are loaded into.
    registry: Arc<PluginRegistry>,
    /// Key dependencies registered by plugins.
    dependencies: Arc<DependencyTable>,
}

impl PluginHost {
    /// Creates a host around an existing registry.
    pub fn new(config: Arc<AppConfig>, registry: Arc<PluginRegistry>) -> Arc<Self> {
        Arc::new(Self {
            config,
            registry,
            dependencies: Arc::new(DependencyTable::new()),
        })
    }

    /// Returns the host configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Returns the dependency table.
    pub fn dependencies(&self) -> &Arc<DependencyTable> {
        &self.dependencies
    }

    /// Creates a handle carrying `plugin` as its caller identity.
    ///
    /// Hooks receive handles bound to the plugin being invoked. A handle for
    /// a name that is not registered can read options but cannot register
    /// dependencies.
    pub fn handle(self: &Arc<Self>, plugin: impl Into<String>) -> PluginHandle {
        PluginHandle {
            host: Arc::clone(self),
            plugin: plugin.into(),
        }
    }

    /// A backend host with default configuration and an empty registry.
    #[cfg(test)]
    pub(crate) fn for_tests() -> Arc<Self> {
        use cfgd_core::config::PluginRole;

        Self::new(
            Arc::new(AppConfig::default()),
            Arc::new(PluginRegistry::new(PluginRole::Backend)),
        )
    }
}

/// Opaque capability passed to every hook.
///
/// The handle is bound to the plugin it was created for, so dependency
/// registration knows its caller without inspecting the call stack.
#[derive(Clone)]
pub struct PluginHandle {
    /// Shared host.
    host: Arc<PluginHost>,
    /// Identity of the plugin holding this handle.
    plugin: String,
}

impl std::fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginHandle")
            .field("plugin", &self.plugin)
            .finish()
    }
}

impl PluginHandle {
    /// Returns the name of the plugin this handle is bound to.
    pub fn name(&self) -> &str {
        &self.plugin
    }

    /// Looks up a host option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.host.config.option(key)
    }

    /// Returns the candidate configuration snapshot.
    pub fn candidate(&self) -> SnapshotRef {
        SnapshotRef::new(&self.host.config.datastore.candidate_db)
    }

    /// Returns the running configuration snapshot.
    pub fn running(&self) -> SnapshotRef {
        SnapshotRef::new(&self.host.config.datastore.running_db)
    }

    /// Returns the host.
    pub fn host(&self) -> &Arc<PluginHost> {
        &self.host
    }

    /// Binds `callback` to changes of keys matching `key_pattern`.
    ///
    /// Fails with [`PluginError::UnknownCaller`] if this handle's identity
    /// is not a registered plugin. Registering the same pattern twice
    /// replaces the earlier entry.
    pub async fn register_dependency(
        &self,
        kind: DependencyKind,
        callback: DependencyCallback,
        arg: serde_json::Value,
        key_pattern: &str,
    ) -> Result<(), PluginError> {
        self.host
            .dependencies
            .register(
                &self.host.registry,
                &self.plugin,
                kind,
                callback,
                arg,
                key_pattern,
            )
            .await
    }
}
