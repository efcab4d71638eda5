//! Plugin registry — discovers plugins and keeps them in registration order.

use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use cfgd_core::config::PluginRole;

use crate::error::PluginError;
use crate::hooks::definitions::{HookArgs, HookKind};
use crate::host::PluginHost;
use crate::loader::ModuleLoader;
use crate::plugin::Plugin;

/// Ordered collection of the plugins serving one role.
///
/// Iteration follows registration order, which is the order every phase
/// invokes hooks in. Names are unique.
#[derive(Debug)]
pub struct PluginRegistry {
    /// Role this registry serves.
    role: PluginRole,
    /// Plugin name → plugin, in registration order.
    plugins: RwLock<IndexMap<String, Arc<Plugin>>>,
}

impl PluginRegistry {
    /// Creates a new empty plugin registry.
    pub fn new(role: PluginRole) -> Self {
        Self {
            role,
            plugins: RwLock::new(IndexMap::new()),
        }
    }

    /// Returns the role of this registry.
    pub fn role(&self) -> PluginRole {
        self.role
    }

    /// Discovers, loads and initialises every unit in `dir`.
    ///
    /// Units are loaded in name order. Each plugin is registered before its
    /// `plugin_init` hook runs, so the hook may register dependencies. If
    /// loading or `plugin_init` fails, discovery stops with
    /// [`PluginError::LoadFailure`]; the failing plugin and any dependencies
    /// it registered are removed again, but plugins registered before it
    /// stay. A missing directory registers nothing.
    ///
    /// `host` must wrap this registry. Returns the number of registered
    /// plugins.
    pub async fn discover(
        &self,
        dir: &Path,
        loader: &dyn ModuleLoader,
        host: &Arc<PluginHost>,
    ) -> Result<usize, PluginError> {
        debug_assert!(
            std::ptr::eq(self, host.registry().as_ref()),
            "host must wrap the registry being populated"
        );

        let units = loader.enumerate(dir)?;
        info!(
            role = %self.role,
            dir = %dir.display(),
            units = units.len(),
            "Discovering plugins"
        );

        for unit in units {
            let module = loader.load(&unit).map_err(|cause| {
                error!(plugin = %unit.name, error = %cause, "Plugin failed to load");
                PluginError::load_failure(&unit.name, cause)
            })?;

            let plugin = Arc::new(Plugin::new(unit.name.as_str(), unit.path, module.as_ref()));
            self.insert(Arc::clone(&plugin)).await?;

            let init = match plugin.invoke(host, HookKind::Init, HookArgs::None).await {
                Ok(Some(signal)) if signal.is_failure() => Err(PluginError::HookFailure {
                    plugin: unit.name.clone(),
                    hook: HookKind::Init,
                    signal: signal.value(),
                }),
                Ok(_) => Ok(()),
                Err(e) => Err(e),
            };

            if let Err(cause) = init {
                error!(plugin = %unit.name, error = %cause, "Plugin failed to initialise");
                self.remove(&unit.name).await;
                host.dependencies().remove_plugin(&unit.name).await;
                return Err(PluginError::load_failure(&unit.name, cause));
            }

            info!(
                plugin = %unit.name,
                hooks = ?plugin.hooks().present(),
                "Plugin loaded"
            );
        }

        Ok(self.len().await)
    }

    /// Registers a plugin.
    pub async fn insert(&self, plugin: Arc<Plugin>) -> Result<(), PluginError> {
        let mut plugins = self.plugins.write().await;
        let name = plugin.name().to_string();

        if plugins.contains_key(&name) {
            warn!(plugin = %name, "Plugin is already registered");
            return Err(PluginError::load_failure(
                &name,
                format!("plugin '{name}' is already registered"),
            ));
        }

        plugins.insert(name, plugin);
        Ok(())
    }

    /// Removes a plugin whose initialisation failed.
    async fn remove(&self, name: &str) {
        let mut plugins = self.plugins.write().await;
        plugins.shift_remove(name);
    }

    /// Gets a plugin by name.
    pub async fn lookup(&self, name: &str) -> Option<Arc<Plugin>> {
        let plugins = self.plugins.read().await;
        plugins.get(name).cloned()
    }

    /// Checks whether a plugin is registered.
    pub async fn contains(&self, name: &str) -> bool {
        let plugins = self.plugins.read().await;
        plugins.contains_key(name)
    }

    /// Returns plugin count.
    pub async fn len(&self) -> usize {
        let plugins = self.plugins.read().await;
        plugins.len()
    }

    /// Returns whether no plugin is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Lists plugin names in registration order.
    pub async fn names(&self) -> Vec<String> {
        let plugins = self.plugins.read().await;
        plugins.keys().cloned().collect()
    }

    /// Returns all plugins in registration order.
    ///
    /// Phases iterate over this copy so hooks never run under the lock.
    pub(crate) async fn snapshot(&self) -> Vec<Arc<Plugin>> {
        let plugins = self.plugins.read().await;
        plugins.values().cloned().collect()
    }
}
