//! Hook table — the optional callbacks a plugin exports, resolved once at load.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use super::definitions::{HookArgs, HookKind, HookSignal};
use crate::host::PluginHandle;
use crate::module::ExtensionModule;

/// Future returned by a hook invocation.
pub type HookFuture = BoxFuture<'static, HookSignal>;

/// A callable hook.
///
/// Wraps an async closure taking the plugin's handle and the hook arguments.
#[derive(Clone)]
pub struct HookFn {
    /// The hook body.
    func: Arc<dyn Fn(PluginHandle, HookArgs) -> HookFuture + Send + Sync>,
}

impl std::fmt::Debug for HookFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookFn").field("func", &"<closure>").finish()
    }
}

impl HookFn {
    /// Creates a hook from an async closure.
    pub fn new<F, Fut, S>(func: F) -> Self
    where
        F: Fn(PluginHandle, HookArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = S> + Send + 'static,
        S: Into<HookSignal> + 'static,
    {
        Self {
            func: Arc::new(move |handle: PluginHandle, args: HookArgs| -> HookFuture {
                let fut = func(handle, args);
                Box::pin(async move { fut.await.into() })
            }),
        }
    }

    /// Creates a hook from a synchronous closure.
    pub fn from_sync<F, S>(func: F) -> Self
    where
        F: Fn(&PluginHandle, &HookArgs) -> S + Send + Sync + 'static,
        S: Into<HookSignal> + 'static,
    {
        Self {
            func: Arc::new(move |handle: PluginHandle, args: HookArgs| -> HookFuture {
                let signal: HookSignal = func(&handle, &args).into();
                Box::pin(std::future::ready(signal))
            }),
        }
    }

    /// Runs the hook.
    pub(crate) fn call(&self, handle: PluginHandle, args: HookArgs) -> HookFuture {
        (self.func)(handle, args)
    }
}

/// Per-plugin lookup of the eight optional hooks.
///
/// Every slot either holds a callable or is explicitly empty.
#[derive(Debug, Clone, Default)]
pub struct HookTable {
    /// One slot per [`HookKind`], indexed by `HookKind::index`.
    slots: [Option<HookFn>; 8],
}

impl HookTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table by asking a module for every hook symbol.
    pub fn resolve(module: &dyn ExtensionModule) -> Self {
        let mut table = Self::new();
        for kind in HookKind::ALL {
            if let Some(hook) = module.resolve(kind.symbol()) {
                table.set(kind, hook);
            }
        }
        table
    }

    /// Installs a hook, replacing any previous one.
    pub fn set(&mut self, kind: HookKind, hook: HookFn) {
        self.slots[kind.index()] = Some(hook);
    }

    /// Returns the hook for `kind`, if present.
    pub fn get(&self, kind: HookKind) -> Option<&HookFn> {
        self.slots[kind.index()].as_ref()
    }

    /// Returns whether a hook is present.
    pub fn has(&self, kind: HookKind) -> bool {
        self.slots[kind.index()].is_some()
    }

    /// Lists the hooks that are present, in table order.
    pub fn present(&self) -> Vec<HookKind> {
        HookKind::ALL
            .into_iter()
            .filter(|kind| self.has(*kind))
            .collect()
    }
}
