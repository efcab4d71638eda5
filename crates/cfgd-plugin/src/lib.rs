//! # cfgd-plugin
//!
//! Plugin framework for cfgd. Provides:
//!
//! - Directory-based plugin discovery into an ordered registry
//! - Per-plugin hook tables resolved once at load time
//! - Lifecycle phases (start, reset, exit) and the transaction protocol
//!   (begin, complete, end, abort)
//! - A dependency table binding key patterns to plugin callbacks
//! - Optional shared-library loading via `libloading` (feature `dynamic`),
//!   with a C host API for reading options and registering dependencies

pub mod dependency;
pub mod error;
pub mod ffi;
pub mod hooks;
pub mod host;
pub mod loader;
pub mod manager;
pub mod module;
pub mod plugin;
pub mod prelude;
pub mod registry;
pub mod transaction;

pub use dependency::{DependencyKind, DependencyTable};
pub use error::PluginError;
pub use hooks::{HookArgs, HookFn, HookKind, HookSignal, PhaseReport};
pub use host::{PluginHandle, PluginHost};
pub use loader::{ModuleLoader, StaticModuleLoader};
pub use manager::PluginManager;
pub use module::{ExtensionModule, StaticModule};
pub use plugin::Plugin;
pub use registry::PluginRegistry;
pub use transaction::{TransactionContext, TransactionError, TransactionOrchestrator};
