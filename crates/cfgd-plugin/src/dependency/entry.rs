//! Dependency entries — one plugin's interest in changes to matching keys.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::pattern::KeyPattern;
use crate::hooks::definitions::HookSignal;
use crate::transaction::context::SnapshotRef;

/// When the storage layer should fire a dependency callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    /// During validation of the candidate.
    Validate,
    /// During commit.
    Commit,
    /// During both validation and commit.
    Both,
}

/// How a key changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    /// The key was added or its value modified.
    Set,
    /// The key was removed.
    Delete,
}

/// A key mutation reported by the storage layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    /// Snapshot the change was observed in.
    pub snapshot: SnapshotRef,
    /// Kind of change.
    pub op: ChangeOp,
    /// The concrete key that changed.
    pub key: String,
}

/// Callback bound to a key pattern.
///
/// Receives the change and the opaque argument given at registration.
#[derive(Clone)]
pub struct DependencyCallback {
    /// The callback body.
    func: Arc<dyn Fn(&KeyChange, &serde_json::Value) -> HookSignal + Send + Sync>,
}

impl std::fmt::Debug for DependencyCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyCallback")
            .field("func", &"<closure>")
            .finish()
    }
}

impl DependencyCallback {
    /// Wraps a closure.
    pub fn new<F, S>(func: F) -> Self
    where
        F: Fn(&KeyChange, &serde_json::Value) -> S + Send + Sync + 'static,
        S: Into<HookSignal> + 'static,
    {
        Self {
            func: Arc::new(move |change: &KeyChange, arg: &serde_json::Value| -> HookSignal {
                func(change, arg).into()
            }),
        }
    }
}

/// One registered dependency.
#[derive(Debug, Clone)]
pub struct DependencyEntry {
    /// Plugin that registered the dependency.
    pub plugin: String,
    /// When the callback fires.
    pub kind: DependencyKind,
    /// Callback to fire.
    pub callback: DependencyCallback,
    /// Opaque argument handed back to the callback.
    pub arg: serde_json::Value,
    /// Keys this entry is interested in.
    pub pattern: KeyPattern,
}

impl DependencyEntry {
    /// Returns the part of `key` matched by this entry's pattern.
    pub fn matched<'k>(&self, key: &'k str) -> Option<&'k str> {
        self.pattern.matches(key)
    }

    /// Fires the callback for a change.
    pub fn fire(&self, change: &KeyChange) -> HookSignal {
        (self.callback.func)(change, &self.arg)
    }
}
