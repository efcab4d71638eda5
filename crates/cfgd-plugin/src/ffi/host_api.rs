//! Host functions exported to shared-library plugins.
//!
//! Hooks receive opaque `handle` and `transaction` pointers; these are the
//! only supported way to read through them. String results are copied
//! `snprintf`-style into a caller buffer (see
//! [`copy_to_buffer`](super::safety::copy_to_buffer)), so a non-negative
//! return larger than `buf_len - 1` means the copy was truncated.
//!
//! ```c
//! int cfgd_option(const void *handle, const char *key, char *buf, size_t buf_len);
//! int cfgd_candidate(const void *handle, char *buf, size_t buf_len);
//! int cfgd_running(const void *handle, char *buf, size_t buf_len);
//! int cfgd_transaction_candidate(const void *transaction, char *buf, size_t buf_len);
//! int cfgd_transaction_running(const void *transaction, char *buf, size_t buf_len);
//! int cfgd_register_dependency(const void *handle, int kind,
//!                              cfgd_dependency_fn callback,
//!                              const char *arg_json, const char *key_pattern);
//! ```
//!
//! The host binary must export these symbols to libraries it opens; the
//! `cfgd` build script links with `-rdynamic` when `dynamic` is enabled.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

use serde_json::Value;
use tracing::warn;

use super::abi::FfiDependencyFn;
use super::safety::{borrow_c_str, copy_to_buffer};
use crate::dependency::entry::{ChangeOp, DependencyCallback, DependencyKind, KeyChange};
use crate::host::PluginHandle;
use crate::transaction::context::TransactionContext;

/// A pointer was null, a string was not UTF-8, or an argument was out of range.
pub const CFGD_EINVAL: c_int = -1;
/// The requested option is not set.
pub const CFGD_ENOENT: c_int = -2;
/// The handle does not belong to a registered plugin.
pub const CFGD_EPERM: c_int = -3;

/// Copies the host option `key` into `buf`.
///
/// # Safety
///
/// `handle` must be the pointer passed to the running hook. `key` must be a
/// NUL-terminated string and `buf` valid for `buf_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_option(
    handle: *const PluginHandle,
    key: *const c_char,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    let (Some(handle), Some(key)) = (unsafe { handle.as_ref() }, unsafe { borrow_c_str(key) })
    else {
        return CFGD_EINVAL;
    };
    match handle.option(key) {
        Some(value) => unsafe { copy_to_buffer(value, buf, buf_len) },
        None => CFGD_ENOENT,
    }
}

/// Copies the candidate datastore reference into `buf`.
///
/// # Safety
///
/// Same contract as [`cfgd_option`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_candidate(
    handle: *const PluginHandle,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    match unsafe { handle.as_ref() } {
        Some(handle) => unsafe { copy_to_buffer(handle.candidate().as_str(), buf, buf_len) },
        None => CFGD_EINVAL,
    }
}

/// Copies the running datastore reference into `buf`.
///
/// # Safety
///
/// Same contract as [`cfgd_option`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_running(
    handle: *const PluginHandle,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    match unsafe { handle.as_ref() } {
        Some(handle) => unsafe { copy_to_buffer(handle.running().as_str(), buf, buf_len) },
        None => CFGD_EINVAL,
    }
}

/// Copies the transaction's candidate snapshot into `buf`.
///
/// # Safety
///
/// `transaction` must be the pointer passed to the running transaction
/// hook and `buf` valid for `buf_len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_transaction_candidate(
    transaction: *const TransactionContext,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    match unsafe { transaction.as_ref() } {
        Some(ctx) => unsafe { copy_to_buffer(ctx.candidate().as_str(), buf, buf_len) },
        None => CFGD_EINVAL,
    }
}

/// Copies the transaction's running snapshot into `buf`.
///
/// # Safety
///
/// Same contract as [`cfgd_transaction_candidate`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_transaction_running(
    transaction: *const TransactionContext,
    buf: *mut c_char,
    buf_len: usize,
) -> c_int {
    match unsafe { transaction.as_ref() } {
        Some(ctx) => unsafe { copy_to_buffer(ctx.running().as_str(), buf, buf_len) },
        None => CFGD_EINVAL,
    }
}

/// Registers `callback` for keys matching `key_pattern` on behalf of the
/// plugin owning `handle`.
///
/// `kind` is 0 for validate, 1 for commit and 2 for both. `arg_json` may be
/// null; otherwise it must hold a JSON document, handed back to every call.
/// Returns 0 on success.
///
/// # Safety
///
/// `handle` must be the pointer passed to the running hook; the string
/// arguments must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn cfgd_register_dependency(
    handle: *const PluginHandle,
    kind: c_int,
    callback: Option<FfiDependencyFn>,
    arg_json: *const c_char,
    key_pattern: *const c_char,
) -> c_int {
    let Some(handle) = (unsafe { handle.as_ref() }) else {
        return CFGD_EINVAL;
    };
    let (Some(kind), Some(callback), Some(pattern)) = (
        dependency_kind(kind),
        callback,
        unsafe { borrow_c_str(key_pattern) },
    ) else {
        warn!(plugin = %handle.name(), kind = kind, "Malformed dependency registration");
        return CFGD_EINVAL;
    };

    let arg = if arg_json.is_null() {
        Value::Null
    } else {
        match unsafe { borrow_c_str(arg_json) }.map(serde_json::from_str::<Value>) {
            Some(Ok(arg)) => arg,
            _ => {
                warn!(plugin = %handle.name(), "Dependency argument is not valid JSON");
                return CFGD_EINVAL;
            }
        }
    };

    let callback = DependencyCallback::new(move |change, arg| fire(callback, change, arg));

    // Hooks run outside every table lock, so this completes without waiting.
    match futures::executor::block_on(handle.register_dependency(kind, callback, arg, pattern)) {
        Ok(()) => 0,
        Err(e) => {
            warn!(plugin = %handle.name(), error = %e, "Dependency registration rejected");
            CFGD_EPERM
        }
    }
}

/// Addresses of every exported host function.
///
/// The binary references these so the linker keeps the symbols.
pub fn exported_symbols() -> [usize; 6] {
    [
        cfgd_option as usize,
        cfgd_candidate as usize,
        cfgd_running as usize,
        cfgd_transaction_candidate as usize,
        cfgd_transaction_running as usize,
        cfgd_register_dependency as usize,
    ]
}

fn dependency_kind(raw: c_int) -> Option<DependencyKind> {
    match raw {
        0 => Some(DependencyKind::Validate),
        1 => Some(DependencyKind::Commit),
        2 => Some(DependencyKind::Both),
        _ => None,
    }
}

fn fire(callback: FfiDependencyFn, change: &KeyChange, arg: &Value) -> c_int {
    let op = match change.op {
        ChangeOp::Set => 0,
        ChangeOp::Delete => 1,
    };
    let (Ok(snapshot), Ok(key), Ok(arg)) = (
        CString::new(change.snapshot.as_str()),
        CString::new(change.key.as_str()),
        CString::new(arg.to_string()),
    ) else {
        warn!(key = %change.key, "Dependency change contains a NUL byte");
        return CFGD_EINVAL;
    };
    unsafe { callback(snapshot.as_ptr(), op, key.as_ptr(), arg.as_ptr()) }
}
