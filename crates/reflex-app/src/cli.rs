//! CLI argument definitions for the Reflex daemon.
//!
//! Uses `clap` with derive macros for ergonomic argument parsing.
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use reflex_core::config::LogFormat;
use reflex_core::ReflexConfig;

/// Reflex - an event-driven automation engine.
#[derive(Parser, Debug, Default)]
#[command(name = "reflex", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Log output format.
    #[arg(long = "log-format", value_parser = ["text", "json"])]
    pub log_format: Option<String>,

    /// Management API bind address.
    #[arg(short = 'b', long = "bind")]
    pub bind: Option<String>,

    /// Do not start the management API.
    #[arg(long = "no-api")]
    pub no_api: bool,

    /// Write the effective configuration to the config path and exit.
    #[arg(long = "write-config")]
    pub write_config: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > REFLEX_CONFIG env var > ./reflex.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("REFLEX_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("reflex.toml")
    }

    /// Whether the config path was chosen explicitly rather than defaulted.
    pub fn config_is_explicit(&self) -> bool {
        self.config.is_some() || std::env::var_os("REFLEX_CONFIG").is_some()
    }

    /// Apply command-line overrides on top of the loaded configuration.
    pub fn apply_overrides(&self, config: &mut ReflexConfig) {
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
        match self.log_format.as_deref() {
            Some("json") => config.general.log_format = LogFormat::Json,
            Some("text") => config.general.log_format = LogFormat::Text,
            _ => {}
        }
        if let Some(ref bind) = self.bind {
            config.api.bind_address = bind.clone();
        }
        if self.no_api {
            config.api.enabled = false;
        }
    }
}
