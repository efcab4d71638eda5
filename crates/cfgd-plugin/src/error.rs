//! Plugin framework errors.

use std::path::PathBuf;

use thiserror::Error;

use cfgd_core::error::{AppError, ErrorKind};

use crate::hooks::definitions::HookKind;

/// Boxed error used for causes coming from module loaders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while loading plugins or dispatching their hooks.
#[derive(Debug, Error)]
pub enum PluginError {
    /// A plugin could not be loaded, or its `plugin_init` hook failed.
    #[error("plugin '{plugin}' failed to load: {cause}")]
    LoadFailure {
        /// Name of the offending plugin.
        plugin: String,
        /// Underlying cause.
        #[source]
        cause: BoxError,
    },

    /// A hook returned a negative signal in a phase that stops on failure.
    #[error("{plugin}.{hook}() failed with signal {signal}")]
    HookFailure {
        /// Plugin whose hook failed.
        plugin: String,
        /// The failing hook.
        hook: HookKind,
        /// Raw signal returned by the hook.
        signal: i32,
    },

    /// Dependency registration from a caller that is not a registered plugin.
    #[error("calling plugin '{caller}' not found")]
    UnknownCaller {
        /// The identity the caller presented.
        caller: String,
    },

    /// A hook panicked.
    #[error("fatal fault in {plugin}.{hook}(): {message}")]
    FatalFault {
        /// Plugin whose hook faulted.
        plugin: String,
        /// The faulting hook.
        hook: HookKind,
        /// Panic message.
        message: String,
    },

    /// The plugin directory exists but could not be read.
    #[error("failed to read plugin directory '{}': {source}", path.display())]
    Io {
        /// Directory being enumerated.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    /// Wraps any error as the load failure of `plugin`.
    pub fn load_failure(plugin: &str, cause: impl Into<BoxError>) -> Self {
        Self::LoadFailure {
            plugin: plugin.to_string(),
            cause: cause.into(),
        }
    }

    /// Returns the plugin this error is attributed to, if any.
    pub fn plugin(&self) -> Option<&str> {
        match self {
            Self::LoadFailure { plugin, .. }
            | Self::HookFailure { plugin, .. }
            | Self::FatalFault { plugin, .. } => Some(plugin),
            Self::UnknownCaller { .. } | Self::Io { .. } => None,
        }
    }

    /// Returns whether this error is a hook fault rather than a signalled failure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalFault { .. })
    }
}

impl From<PluginError> for AppError {
    fn from(err: PluginError) -> Self {
        let kind = match &err {
            PluginError::Io { .. } => ErrorKind::Io,
            PluginError::UnknownCaller { .. } => ErrorKind::NotFound,
            _ => ErrorKind::Plugin,
        };
        AppError::with_source(kind, err.to_string(), err)
    }
}
