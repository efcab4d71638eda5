//! Extension modules — a loaded unit that resolves hook symbols.

use std::collections::HashMap;

use crate::hooks::definitions::HookKind;
use crate::hooks::table::HookFn;

/// A loaded extension unit.
///
/// The registry queries a module once, by symbol name, for each of the
/// eight recognised hooks; see [`HookKind::symbol`].
pub trait ExtensionModule: Send + Sync + std::fmt::Debug {
    /// Returns the hook exported under `symbol`, if any.
    fn resolve(&self, symbol: &str) -> Option<HookFn>;
}

/// An in-process module assembled from closures.
///
/// Used for compiled-in plugins, and as the module type handed out by
/// [`StaticModuleLoader`](crate::loader::StaticModuleLoader).
#[derive(Debug, Clone, Default)]
pub struct StaticModule {
    /// Symbol name → hook.
    hooks: HashMap<&'static str, HookFn>,
}

impl StaticModule {
    /// Creates a module exporting no hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exports `hook` under the symbol of `kind`.
    pub fn on(mut self, kind: HookKind, hook: HookFn) -> Self {
        self.hooks.insert(kind.symbol(), hook);
        self
    }
}

impl ExtensionModule for StaticModule {
    fn resolve(&self, symbol: &str) -> Option<HookFn> {
        self.hooks.get(symbol).cloned()
    }
}
