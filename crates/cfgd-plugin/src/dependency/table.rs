//! Dependency table — registered key dependencies, keyed by plugin and pattern.

use std::sync::Arc;

use indexmap::IndexMap;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::entry::{DependencyCallback, DependencyEntry, DependencyKind};
use super::pattern::KeyPattern;
use crate::error::PluginError;
use crate::registry::PluginRegistry;

/// Table key: owning plugin and the pattern text as registered.
type EntryKey = (String, String);

/// All dependencies registered by plugins, in registration order.
///
/// A plugin may hold several entries; registering the same pattern again
/// replaces the entry in place.
#[derive(Debug, Default)]
pub struct DependencyTable {
    /// (plugin, pattern) → entry.
    entries: RwLock<IndexMap<EntryKey, Arc<DependencyEntry>>>,
}

impl DependencyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dependency on behalf of `caller`.
    ///
    /// `caller` must name a plugin in `registry`.
    pub async fn register(
        &self,
        registry: &PluginRegistry,
        caller: &str,
        kind: DependencyKind,
        callback: DependencyCallback,
        arg: serde_json::Value,
        key_pattern: &str,
    ) -> Result<(), PluginError> {
        if !registry.contains(caller).await {
            warn!(
                caller = %caller,
                pattern = %key_pattern,
                "Dependency registration from unknown caller"
            );
            return Err(PluginError::UnknownCaller {
                caller: caller.to_string(),
            });
        }

        let entry = DependencyEntry {
            plugin: caller.to_string(),
            kind,
            callback,
            arg,
            pattern: KeyPattern::parse(key_pattern),
        };

        let mut entries = self.entries.write().await;
        let replaced = entries
            .insert((caller.to_string(), key_pattern.to_string()), Arc::new(entry))
            .is_some();

        debug!(
            plugin = %caller,
            pattern = %key_pattern,
            kind = ?kind,
            replaced = replaced,
            "Dependency registered"
        );

        Ok(())
    }

    /// Returns the entries whose pattern matches `key`, in registration order.
    pub async fn lookup_for_key(&self, key: &str) -> Vec<Arc<DependencyEntry>> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| entry.matched(key).is_some())
            .cloned()
            .collect()
    }

    /// Returns every entry registered by `plugin`.
    pub async fn entries_for(&self, plugin: &str) -> Vec<Arc<DependencyEntry>> {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|entry| entry.plugin == plugin)
            .cloned()
            .collect()
    }

    /// Drops every entry registered by `plugin`. Returns how many were removed.
    pub async fn remove_plugin(&self, plugin: &str) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(owner, _), _| owner != plugin);
        let removed = before - entries.len();
        if removed > 0 {
            debug!(plugin = %plugin, removed = removed, "Dependencies dropped");
        }
        removed
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
