//! Prelude for plugin authors and hosts.

pub use crate::dependency::{ChangeOp, DependencyCallback, DependencyKind, KeyChange};
pub use crate::error::PluginError;
pub use crate::hooks::{HookArgs, HookFn, HookKind, HookSignal, PhaseReport};
pub use crate::host::PluginHandle;
pub use crate::loader::{ModuleLoader, StaticModuleLoader};
pub use crate::manager::PluginManager;
pub use crate::module::{ExtensionModule, StaticModule};
pub use crate::transaction::{
    SnapshotRef, TransactionContext, TransactionError, TransactionOrchestrator, TransactionPhase,
};
