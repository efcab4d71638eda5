//! Hook dispatcher — runs one hook kind across every registered plugin.
//!
//! Plugins are visited in registration order, one at a time.
//!
//! For vetoing phases (`plugin_start`, `plugin_reset`, `transaction_begin`,
//! `transaction_complete`, `transaction_end`):
//! - The first negative signal stops the phase; later plugins are not called.
//! - A panicking hook stops the phase as a fatal fault.
//!
//! For best-effort phases (`plugin_exit`, `transaction_abort`):
//! - Every plugin with the hook is called regardless of earlier results.
//! - Failures and faults are logged and collected, never returned.
//!
//! Plugins lacking the hook are skipped; that counts as success.

use std::sync::Arc;

use tracing::{debug, error, warn};

use super::definitions::{HookArgs, HookKind};
use crate::error::PluginError;
use crate::host::PluginHost;

/// A failure swallowed by a best-effort phase.
#[derive(Debug)]
pub struct SuppressedFailure {
    /// Plugin whose hook failed.
    pub plugin: String,
    /// The failure.
    pub error: PluginError,
}

/// Outcome of running one phase to completion.
#[derive(Debug)]
pub struct PhaseReport {
    /// The hook that was run.
    pub hook: HookKind,
    /// Plugins whose hook was called, in call order.
    pub invoked: Vec<String>,
    /// Plugins skipped because they lack the hook.
    pub skipped: Vec<String>,
    /// Failures swallowed by a best-effort phase.
    pub suppressed: Vec<SuppressedFailure>,
}

impl PhaseReport {
    fn new(hook: HookKind) -> Self {
        Self {
            hook,
            invoked: Vec::new(),
            skipped: Vec::new(),
            suppressed: Vec::new(),
        }
    }

    /// Returns whether every invoked hook succeeded.
    pub fn is_clean(&self) -> bool {
        self.suppressed.is_empty()
    }
}

/// Runs a phase that stops at the first failure.
pub(crate) async fn run_vetoing(
    host: &Arc<PluginHost>,
    hook: HookKind,
    args: HookArgs,
) -> Result<PhaseReport, PluginError> {
    let plugins = host.registry().snapshot().await;
    let mut report = PhaseReport::new(hook);

    debug!(hook = %hook, plugins = plugins.len(), "Dispatching vetoing phase");

    for plugin in &plugins {
        if !plugin.has(hook) {
            report.skipped.push(plugin.name().to_string());
            continue;
        }
        report.invoked.push(plugin.name().to_string());

        match plugin.invoke(host, hook, args.clone()).await {
            Ok(Some(signal)) if signal.is_failure() => {
                warn!(
                    hook = %hook,
                    plugin = %plugin.name(),
                    signal = signal.value(),
                    "Hook vetoed phase"
                );
                return Err(PluginError::HookFailure {
                    plugin: plugin.name().to_string(),
                    hook,
                    signal: signal.value(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                error!(hook = %hook, plugin = %plugin.name(), error = %e, "Hook faulted");
                return Err(e);
            }
        }
    }

    Ok(report)
}

/// Runs a phase that visits every plugin whatever the outcome.
pub(crate) async fn run_best_effort(
    host: &Arc<PluginHost>,
    hook: HookKind,
    args: HookArgs,
) -> PhaseReport {
    let plugins = host.registry().snapshot().await;
    let mut report = PhaseReport::new(hook);

    debug!(hook = %hook, plugins = plugins.len(), "Dispatching best-effort phase");

    for plugin in &plugins {
        if !plugin.has(hook) {
            report.skipped.push(plugin.name().to_string());
            continue;
        }
        report.invoked.push(plugin.name().to_string());

        let failure = match plugin.invoke(host, hook, args.clone()).await {
            Ok(Some(signal)) if signal.is_failure() => PluginError::HookFailure {
                plugin: plugin.name().to_string(),
                hook,
                signal: signal.value(),
            },
            Ok(_) => continue,
            Err(e) => e,
        };

        warn!(
            hook = %hook,
            plugin = %plugin.name(),
            error = %failure,
            "Ignoring hook failure"
        );
        report.suppressed.push(SuppressedFailure {
            plugin: plugin.name().to_string(),
            error: failure,
        });
    }

    report
}
