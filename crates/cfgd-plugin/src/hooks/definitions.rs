//! Hook kinds, hook return signals, and the arguments handed to hooks.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::transaction::context::TransactionContext;

/// Enumeration of the eight optional callbacks a plugin may export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    // ── Lifecycle ──
    /// Called once right after the plugin is loaded.
    Init,
    /// Called when the host starts, with the daemon's arguments.
    Start,
    /// Called when the host shuts down.
    Exit,
    /// Called to reset system state to its original state.
    Reset,

    // ── Transaction ──
    /// Called before a validate/commit sequence begins.
    Begin,
    /// Called after validation completed successfully, before commit.
    Complete,
    /// Called after a commit sequence completed successfully.
    End,
    /// Called when a validate/commit sequence fails.
    Abort,
}

impl HookKind {
    /// All hook kinds, in hook table order.
    pub const ALL: [HookKind; 8] = [
        Self::Init,
        Self::Start,
        Self::Exit,
        Self::Reset,
        Self::Begin,
        Self::Complete,
        Self::End,
        Self::Abort,
    ];

    /// Returns the exported symbol name a module provides for this hook.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Init => "plugin_init",
            Self::Start => "plugin_start",
            Self::Exit => "plugin_exit",
            Self::Reset => "plugin_reset",
            Self::Begin => "transaction_begin",
            Self::Complete => "transaction_complete",
            Self::End => "transaction_end",
            Self::Abort => "transaction_abort",
        }
    }

    /// Resolves an exported symbol name back to its hook kind.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.symbol() == symbol)
    }

    /// Position of this hook in a hook table.
    pub(crate) fn index(self) -> usize {
        self as usize
    }

    /// Returns whether failures in this hook are logged and skipped
    /// instead of stopping the phase.
    pub fn is_best_effort(&self) -> bool {
        matches!(self, Self::Exit | Self::Abort)
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Integer return signal of a hook: negative means failure, anything else
/// is success (often a count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookSignal(i32);

impl HookSignal {
    /// Plain success.
    pub const OK: HookSignal = HookSignal(0);
    /// Plain failure.
    pub const FAILED: HookSignal = HookSignal(-1);

    /// Wraps a raw return value.
    pub fn new(value: i32) -> Self {
        Self(value)
    }

    /// Returns the raw value.
    pub fn value(&self) -> i32 {
        self.0
    }

    /// Returns whether the hook signalled failure.
    pub fn is_failure(&self) -> bool {
        self.0 < 0
    }
}

impl From<i32> for HookSignal {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<bool> for HookSignal {
    fn from(ok: bool) -> Self {
        if ok { Self::OK } else { Self::FAILED }
    }
}

impl fmt::Display for HookSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Arguments passed to a hook next to the plugin's handle.
#[derive(Debug, Clone)]
pub enum HookArgs {
    /// `plugin_init`, `plugin_exit`, `plugin_reset`.
    None,
    /// `plugin_start`: the host's command-line arguments.
    Start(Arc<[String]>),
    /// Transaction hooks: the in-flight transaction.
    Transaction(TransactionContext),
}

impl HookArgs {
    /// Returns the transaction for transaction hooks.
    pub fn transaction(&self) -> Option<&TransactionContext> {
        match self {
            Self::Transaction(ctx) => Some(ctx),
            _ => None,
        }
    }

    /// Returns the start arguments, empty for every other hook.
    pub fn start_args(&self) -> &[String] {
        match self {
            Self::Start(args) => args,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbols_round_trip_through_lookup() {
        for kind in HookKind::ALL {
            assert_eq!(HookKind::from_symbol(kind.symbol()), Some(kind));
        }
        assert_eq!(HookKind::from_symbol("transaction_commit"), None);
    }

    #[test]
    fn test_table_index_matches_all_order() {
        for (i, kind) in HookKind::ALL.into_iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn test_best_effort_hooks() {
        let best_effort: Vec<_> = HookKind::ALL
            .into_iter()
            .filter(HookKind::is_best_effort)
            .collect();
        assert_eq!(best_effort, vec![HookKind::Exit, HookKind::Abort]);
    }

    #[test]
    fn test_signal_convention() {
        assert!(HookSignal::new(-3).is_failure());
        assert!(!HookSignal::new(0).is_failure());
        assert!(!HookSignal::new(7).is_failure());
        assert_eq!(HookSignal::from(false), HookSignal::FAILED);
    }
}
