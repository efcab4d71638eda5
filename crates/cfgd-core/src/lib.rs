//! # cfgd-core
//!
//! Core crate for cfgd. Contains the configuration schemas shared by the
//! daemon and the plugin framework, and the unified error system.
//!
//! This crate has **no** internal dependencies on other cfgd crates.

pub mod config;
pub mod error;
pub mod result;

pub use error::AppError;
pub use result::AppResult;
