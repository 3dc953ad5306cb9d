//! Reflex application binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Register the built-in modules and build the engine
//! 3. Seed the reaction store from persistence
//! 4. Start the event loop and start setting up the configured modules
//! 5. Serve the management API until Ctrl-C

mod cli;

use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use reflex_api::{routes, AppState};
use reflex_core::config::{ConfigProviderKind, LogFormat, StorageConfig, StorageProvider};
use reflex_core::error::ReflexError;
use reflex_core::ReflexConfig;
use reflex_engine::{
    register_builtins, ActionRegistry, ConfigResolver, EmptyResolver, Engine, LocalFilesResolver,
    SourceRegistry,
};
use reflex_script::LuaScriptEngine;
use reflex_storage::{Database, ReactionPersistence, ReactionRepository};

use crate::cli::CliArgs;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Load the config file and apply command-line overrides.
fn load_config(args: &CliArgs) -> Result<ReflexConfig, ReflexError> {
    // `--write-config` may target a file that does not exist yet.
    let explicit = args.config_is_explicit() && !args.write_config;
    let mut config = read_config(&args.resolve_config_path(), explicit)?;
    args.apply_overrides(&mut config);
    Ok(config)
}

/// An explicitly named file must exist and parse. The default
/// `./reflex.toml` falls back to defaults with a warning.
fn read_config(path: &Path, explicit: bool) -> Result<ReflexConfig, ReflexError> {
    if explicit {
        return ReflexConfig::load(path);
    }
    if !path.exists() {
        return Ok(ReflexConfig::default());
    }
    // The global subscriber needs the loaded log settings, so report
    // fallback warnings on stderr.
    let early = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .finish();
    Ok(tracing::subscriber::with_default(early, || {
        ReflexConfig::load_or_default(path)
    }))
}

fn build_resolver(kind: ConfigProviderKind, path: &str) -> Arc<dyn ConfigResolver> {
    match kind {
        ConfigProviderKind::LocalFiles => Arc::new(LocalFilesResolver::new(path)),
        ConfigProviderKind::None => Arc::new(EmptyResolver),
    }
}

fn open_persistence(storage: &StorageConfig) -> Result<Arc<dyn ReactionPersistence>, ReflexError> {
    let db = match storage.provider {
        StorageProvider::Sqlite => Database::new(Path::new(&storage.path))?,
        StorageProvider::Memory => Database::in_memory()?,
    };
    Ok(Arc::new(ReactionRepository::new(Arc::new(db))))
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();
    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("reflex: {}", e);
            return Err(e.into());
        }
    };

    if args.write_config {
        let path = args.resolve_config_path();
        config.save(&path)?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    init_tracing(&config.general.log_level, config.general.log_format);
    tracing::info!("Starting Reflex v{}", env!("CARGO_PKG_VERSION"));

    // Modules.
    let actions = Arc::new(ActionRegistry::for_actions());
    let sources = Arc::new(SourceRegistry::for_sources());
    register_builtins(&actions, &sources);

    let scripts = Arc::new(
        LuaScriptEngine::new(config.script.instruction_limit)
            .with_memory_limit(config.script.memory_limit),
    );
    let engine = Arc::new(Engine::new(actions, sources, scripts));

    // Reactions.
    let persistence = match open_persistence(&config.storage) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(path = %config.storage.path, error = %e, "Failed to open reaction storage");
            return Err(e.into());
        }
    };
    engine.seed(persistence.all()?);

    // Event loop first, so events emitted during setup are not lost.
    let (events, event_loop) = engine.spawn_event_loop(config.general.events_buffer_size);

    // Setup runs in the background; a slow module never holds up the API.
    let resolver = build_resolver(config.config_provider.provider, &config.config_provider.path);
    let setup = engine.start_modules(
        resolver,
        &config.modules.action_modules,
        &config.modules.event_sources,
        &events,
    );

    if config.api.enabled {
        let state = AppState::new(Arc::clone(&engine), persistence);
        if let Err(e) =
            routes::start_server(&config.api.bind_address, state, shutdown_signal()).await
        {
            tracing::error!(addr = %config.api.bind_address, error = %e, "API server failed");
            return Err(e.into());
        }
    } else {
        tracing::info!("Management API disabled");
        shutdown_signal().await;
    }

    // In-flight pipelines and unfinished setups are not drained.
    setup.abort();
    drop(events);
    event_loop.abort();
    tracing::info!("Reflex stopped");
    Ok(())
}
