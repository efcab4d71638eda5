//! A loaded plugin: identity, module, and hook table.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tracing::debug;

use crate::error::PluginError;
use crate::hooks::definitions::{HookArgs, HookKind, HookSignal};
use crate::hooks::table::HookTable;
use crate::host::PluginHost;
use crate::module::ExtensionModule;

/// One loaded extension unit.
///
/// Plugins are created during discovery and live for the rest of the
/// process. The plugin itself is a pure dispatcher: it adds nothing beyond
/// what the invoked hook does.
#[derive(Debug)]
pub struct Plugin {
    /// Name, the discovery-time basename of the unit.
    name: String,
    /// Path the unit was loaded from.
    path: PathBuf,
    /// Hooks resolved from the module at load time.
    hooks: HookTable,
}

impl Plugin {
    /// Wraps a loaded module, resolving its hooks.
    ///
    /// Hooks keep whatever the module needs alive, so the module itself is
    /// not retained.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        module: &dyn ExtensionModule,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            hooks: HookTable::resolve(module),
        }
    }

    /// Returns the plugin name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the path the plugin was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the hook table.
    pub fn hooks(&self) -> &HookTable {
        &self.hooks
    }

    /// Returns whether the plugin exports `kind`.
    pub fn has(&self, kind: HookKind) -> bool {
        self.hooks.has(kind)
    }

    /// Invokes a hook with a handle bound to this plugin.
    ///
    /// Returns `Ok(None)` if the hook is absent. A panic inside the hook
    /// becomes [`PluginError::FatalFault`].
    pub async fn invoke(
        &self,
        host: &Arc<PluginHost>,
        kind: HookKind,
        args: HookArgs,
    ) -> Result<Option<HookSignal>, PluginError> {
        let Some(hook) = self.hooks.get(kind) else {
            return Ok(None);
        };

        debug!(plugin = %self.name, hook = %kind, "Calling hook");

        let handle = host.handle(self.name.as_str());
        let call = async move { hook.call(handle, args).await };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(signal) => {
                debug!(plugin = %self.name, hook = %kind, signal = signal.value(), "Hook returned");
                Ok(Some(signal))
            }
            Err(panic) => Err(PluginError::FatalFault {
                plugin: self.name.clone(),
                hook: kind,
                message: panic_message(panic.as_ref()),
            }),
        }
    }
}

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "hook panicked".to_string()
    }
}
