//! Plugin manager — owns one registry and runs its lifecycle phases.

use std::sync::Arc;

use tracing::{error, info, warn};

use cfgd_core::config::{AppConfig, PluginRole};

use crate::error::PluginError;
use crate::hooks::definitions::{HookArgs, HookKind};
use crate::hooks::dispatcher::{self, PhaseReport};
use crate::host::PluginHost;
use crate::loader::ModuleLoader;
use crate::registry::PluginRegistry;
use crate::transaction::orchestrator::TransactionOrchestrator;

/// Manages the lifecycle of the plugins serving one role: discovery,
/// start, reset and exit. Plugins are never unloaded.
#[derive(Debug)]
pub struct PluginManager {
    /// Shared host handed to hooks.
    host: Arc<PluginHost>,
    /// Loader used for discovery.
    loader: Arc<dyn ModuleLoader>,
}

impl PluginManager {
    /// Creates a manager with an empty registry for `role`.
    pub fn new(config: Arc<AppConfig>, role: PluginRole, loader: Arc<dyn ModuleLoader>) -> Self {
        let registry = Arc::new(PluginRegistry::new(role));
        Self {
            host: PluginHost::new(config, registry),
            loader,
        }
    }

    /// Discovers and initialises every plugin in the role's configured
    /// directory. Returns the number of registered plugins.
    pub async fn load_all(&self) -> Result<usize, PluginError> {
        let registry = self.host.registry();
        let dir = self.host.config().plugins.directory_for(registry.role());

        match registry.discover(dir, self.loader.as_ref(), &self.host).await {
            Ok(count) => {
                info!(role = %registry.role(), count = count, "Plugins loaded");
                Ok(count)
            }
            Err(e) => {
                error!(role = %registry.role(), error = %e, "Plugin discovery failed");
                Err(e)
            }
        }
    }

    /// Runs `plugin_start` with the daemon's arguments, stopping at the
    /// first failure.
    pub async fn start(&self, args: &[String]) -> Result<PhaseReport, PluginError> {
        let args = HookArgs::Start(args.into());
        let report = dispatcher::run_vetoing(&self.host, HookKind::Start, args).await?;
        info!(invoked = report.invoked.len(), "Plugins started");
        Ok(report)
    }

    /// Runs `plugin_reset`, stopping at the first failure.
    pub async fn reset(&self) -> Result<PhaseReport, PluginError> {
        let report = dispatcher::run_vetoing(&self.host, HookKind::Reset, HookArgs::None).await?;
        info!(invoked = report.invoked.len(), "Plugins reset");
        Ok(report)
    }

    /// Runs `plugin_exit` on every plugin. Failures are logged and
    /// collected in the report.
    pub async fn exit(&self) -> PhaseReport {
        let report = dispatcher::run_best_effort(&self.host, HookKind::Exit, HookArgs::None).await;
        if report.is_clean() {
            info!(invoked = report.invoked.len(), "Plugins exited");
        } else {
            warn!(failures = report.suppressed.len(), "Plugins exited with failures");
        }
        report
    }

    /// Returns a transaction orchestrator over this manager's plugins.
    pub fn orchestrator(&self) -> TransactionOrchestrator {
        TransactionOrchestrator::new(Arc::clone(&self.host))
    }

    /// Returns the shared host.
    pub fn host(&self) -> &Arc<PluginHost> {
        &self.host
    }

    /// Returns the plugin registry.
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        self.host.registry()
    }
}
