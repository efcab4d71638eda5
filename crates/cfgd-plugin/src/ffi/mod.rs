//! C ABI for shared-library plugins.

pub mod abi;
pub mod host_api;
pub mod safety;
