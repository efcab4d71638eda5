//! cfgd — configuration daemon plugin host.
//!
//! Loads the configured plugins, starts them, and keeps them running until
//! the process is asked to stop.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{EnvFilter, fmt};

use cfgd_core::config::{AppConfig, PluginRole};
use cfgd_core::result::AppResult;
use cfgd_plugin::loader::ModuleLoader;
use cfgd_plugin::manager::PluginManager;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "cfgd", version, about = "Configuration daemon plugin host")]
struct Cli {
    /// Configuration file; falls back to `CFGD_CONFIG`.
    #[arg(short, long, env = "CFGD_CONFIG")]
    config: Option<PathBuf>,

    /// Which plugin set to host.
    #[arg(long, value_enum, default_value_t = Role::Backend)]
    role: Role,

    /// Arguments passed through to every `plugin_start` hook.
    #[arg(last = true)]
    plugin_args: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Role {
    Backend,
    Frontend,
}

impl From<Role> for PluginRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Backend => PluginRole::Backend,
            Role::Frontend => PluginRole::Frontend,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(cli, config).await {
        tracing::error!(error = %e, "Daemon error");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

#[cfg(feature = "dynamic")]
fn module_loader(config: &AppConfig) -> Arc<dyn ModuleLoader> {
    std::hint::black_box(cfgd_plugin::ffi::host_api::exported_symbols());
    Arc::new(cfgd_plugin::loader::LibraryLoader::with_extension(
        config.plugins.extension.clone(),
    ))
}

#[cfg(not(feature = "dynamic"))]
fn module_loader(config: &AppConfig) -> Arc<dyn ModuleLoader> {
    tracing::warn!(
        extension = %config.plugins.extension,
        "Built without the `dynamic` feature; every plugin unit found will fail to load"
    );
    Arc::new(cfgd_plugin::loader::StaticModuleLoader::new(
        config.plugins.extension.clone(),
    ))
}

async fn run(cli: Cli, config: AppConfig) -> AppResult<()> {
    let role = PluginRole::from(cli.role);
    tracing::info!(role = %role, "Starting cfgd v{}", env!("CARGO_PKG_VERSION"));

    let loader = module_loader(&config);
    let config = Arc::new(config);
    let manager = PluginManager::new(Arc::clone(&config), role, loader);

    if config.plugins.auto_load {
        manager.load_all().await?;
    } else {
        tracing::info!("Plugin auto-load disabled");
    }

    manager.start(&cli.plugin_args).await?;

    shutdown_signal().await?;
    tracing::info!("Shutdown signal received");

    let report = manager.exit().await;
    tracing::info!(
        invoked = report.invoked.len(),
        failures = report.suppressed.len(),
        "cfgd stopped"
    );
    Ok(())
}

async fn shutdown_signal() -> AppResult<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = ctrl_c => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    ctrl_c.await?;

    Ok(())
}
