//! Module loaders — enumerate loadable units in a directory and load them.
//!
//! The registry never touches the filesystem itself; it asks a
//! [`ModuleLoader`] for the units in a directory and for each loaded unit.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::error::{BoxError, PluginError};
use crate::module::ExtensionModule;

/// A loadable unit found in a plugin directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleUnit {
    /// Plugin name: the file's basename without extension.
    pub name: String,
    /// Full path of the unit.
    pub path: PathBuf,
}

/// Capability supplied by the host for discovering and loading plugins.
pub trait ModuleLoader: Send + Sync + std::fmt::Debug {
    /// File extension (without the dot) of loadable units.
    fn extension(&self) -> &str;

    /// Lists the loadable units in `dir`, sorted by name.
    ///
    /// A missing directory yields no units.
    fn enumerate(&self, dir: &Path) -> Result<Vec<ModuleUnit>, PluginError> {
        scan_directory(dir, self.extension())
    }

    /// Loads one unit.
    fn load(&self, unit: &ModuleUnit) -> Result<Arc<dyn ExtensionModule>, BoxError>;
}

/// Lists regular files in `dir` carrying `extension`, sorted lexically by name.
pub fn scan_directory(dir: &Path, extension: &str) -> Result<Vec<ModuleUnit>, PluginError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(dir = %dir.display(), "Plugin directory does not exist");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(PluginError::Io {
                path: dir.to_path_buf(),
                source,
            });
        }
    };

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| PluginError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            debug!(path = %path.display(), "Skipping plugin with non UTF-8 name");
            continue;
        };
        units.push(ModuleUnit {
            name: name.to_string(),
            path,
        });
    }

    units.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(units)
}

/// Loader for compiled-in modules.
///
/// Units are still enumerated from the plugin directory; a unit named
/// `ntp` loads the module registered as `ntp`.
#[derive(Debug, Clone, Default)]
pub struct StaticModuleLoader {
    /// Extension of unit files.
    extension: String,
    /// Module name → module.
    modules: HashMap<String, Arc<dyn ExtensionModule>>,
}

impl StaticModuleLoader {
    /// Creates a loader whose units carry `extension`.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            modules: HashMap::new(),
        }
    }

    /// Registers a module under `name`.
    pub fn register(&mut self, name: impl Into<String>, module: Arc<dyn ExtensionModule>) {
        self.modules.insert(name.into(), module);
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_module(
        mut self,
        name: impl Into<String>,
        module: impl ExtensionModule + 'static,
    ) -> Self {
        self.register(name, Arc::new(module));
        self
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn load(&self, unit: &ModuleUnit) -> Result<Arc<dyn ExtensionModule>, BoxError> {
        self.modules
            .get(&unit.name)
            .cloned()
            .ok_or_else(|| format!("no module named '{}' is compiled in", unit.name).into())
    }
}

/// Shared-library loader using `libloading` (feature-gated).
#[cfg(feature = "dynamic")]
pub mod dynamic_loader {
    use std::os::raw::c_char;
    use std::path::PathBuf;
    use std::sync::Arc;

    use tracing::{info, warn};

    use super::{ModuleLoader, ModuleUnit};
    use crate::error::BoxError;
    use crate::ffi::abi::{FfiLifecycleFn, FfiStartFn, FfiTransactionFn};
    use crate::ffi::safety::to_c_strings;
    use crate::hooks::definitions::HookKind;
    use crate::hooks::table::HookFn;
    use crate::host::PluginHandle;
    use crate::module::ExtensionModule;
    use crate::transaction::context::TransactionContext;

    /// Loads plugins from shared libraries (.so / .dll / .dylib).
    #[derive(Debug, Clone)]
    pub struct LibraryLoader {
        /// Extension of library files.
        extension: String,
    }

    impl LibraryLoader {
        /// Creates a loader for the platform's shared library extension.
        pub fn new() -> Self {
            Self::with_extension(std::env::consts::DLL_EXTENSION)
        }

        /// Creates a loader for a custom extension.
        pub fn with_extension(extension: impl Into<String>) -> Self {
            Self {
                extension: extension.into(),
            }
        }
    }

    impl Default for LibraryLoader {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ModuleLoader for LibraryLoader {
        fn extension(&self) -> &str {
            &self.extension
        }

        /// Opens the library.
        ///
        /// This loads arbitrary code into the process; only point the loader
        /// at trusted plugin directories.
        fn load(&self, unit: &ModuleUnit) -> Result<Arc<dyn ExtensionModule>, BoxError> {
            let library = unsafe { libloading::Library::new(&unit.path) }?;

            info!(plugin = %unit.name, path = %unit.path.display(), "Shared library loaded");

            Ok(Arc::new(LibraryModule {
                path: unit.path.clone(),
                library: Arc::new(library),
            }))
        }
    }

    /// A shared library exporting some of the C-ABI hook symbols.
    pub struct LibraryModule {
        /// Library path.
        path: PathBuf,
        /// The library, kept alive by every hook resolved from it.
        library: Arc<libloading::Library>,
    }

    impl std::fmt::Debug for LibraryModule {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("LibraryModule")
                .field("path", &self.path)
                .finish()
        }
    }

    impl ExtensionModule for LibraryModule {
        fn resolve(&self, symbol: &str) -> Option<HookFn> {
            let kind = HookKind::from_symbol(symbol)?;
            let library = Arc::clone(&self.library);

            match kind {
                HookKind::Init | HookKind::Exit | HookKind::Reset => {
                    let func: FfiLifecycleFn =
                        unsafe { *self.library.get::<FfiLifecycleFn>(symbol.as_bytes()).ok()? };
                    Some(HookFn::from_sync(move |handle, _args| {
                        let _library = &library;
                        unsafe { func(handle as *const PluginHandle) }
                    }))
                }
                HookKind::Start => {
                    let func: FfiStartFn =
                        unsafe { *self.library.get::<FfiStartFn>(symbol.as_bytes()).ok()? };
                    Some(HookFn::from_sync(move |handle, args| {
                        let _library = &library;
                        let Some(owned) = to_c_strings(args.start_args()) else {
                            warn!(plugin = %handle.name(), "Start argument contains a NUL byte");
                            return -1;
                        };
                        let argv: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
                        unsafe {
                            func(
                                handle as *const PluginHandle,
                                argv.len() as i32,
                                argv.as_ptr(),
                            )
                        }
                    }))
                }
                HookKind::Begin | HookKind::Complete | HookKind::End | HookKind::Abort => {
                    let func: FfiTransactionFn =
                        unsafe { *self.library.get::<FfiTransactionFn>(symbol.as_bytes()).ok()? };
                    Some(HookFn::from_sync(move |handle, args| {
                        let _library = &library;
                        let Some(ctx) = args.transaction() else {
                            return -1;
                        };
                        unsafe {
                            func(
                                handle as *const PluginHandle,
                                ctx as *const TransactionContext,
                            )
                        }
                    }))
                }
            }
        }
    }
}

#[cfg(feature = "dynamic")]
pub use dynamic_loader::LibraryLoader;
