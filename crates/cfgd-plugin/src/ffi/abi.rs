//! FFI ABI definitions for shared-library plugins.
//!
//! A library exports any subset of the eight hook symbols with these
//! C-compatible signatures. The handle and transaction pointers are opaque
//! to the plugin and valid only for the duration of the call.
//!
//! ```c
//! int plugin_init(const void *handle);
//! int plugin_start(const void *handle, int argc, const char **argv);
//! int transaction_begin(const void *handle, const void *transaction);
//! ```
//!
//! Plugins read through those pointers with the host functions in
//! [`host_api`](super::host_api).

use std::os::raw::{c_char, c_int};

use crate::host::PluginHandle;
use crate::transaction::context::TransactionContext;

/// `plugin_init`, `plugin_exit`, `plugin_reset`.
pub type FfiLifecycleFn = unsafe extern "C" fn(handle: *const PluginHandle) -> c_int;

/// `plugin_start`.
pub type FfiStartFn = unsafe extern "C" fn(
    handle: *const PluginHandle,
    argc: c_int,
    argv: *const *const c_char,
) -> c_int;

/// `transaction_begin`, `transaction_complete`, `transaction_end`,
/// `transaction_abort`.
pub type FfiTransactionFn = unsafe extern "C" fn(
    handle: *const PluginHandle,
    transaction: *const TransactionContext,
) -> c_int;

/// Dependency callback registered through `cfgd_register_dependency`.
///
/// `op` is 0 for a set and 1 for a delete. `arg_json` is the argument given
/// at registration, serialized as JSON. All strings are valid only for the
/// duration of the call.
pub type FfiDependencyFn = unsafe extern "C" fn(
    snapshot: *const c_char,
    op: c_int,
    key: *const c_char,
    arg_json: *const c_char,
) -> c_int;
