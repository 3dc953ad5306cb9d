use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ReflexError, Result};

/// Top-level configuration for the Reflex engine.
///
/// Loaded from `reflex.toml` by default. Every section is optional and falls
/// back to its defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflexConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub config_provider: ConfigProviderConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub script: ScriptConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

impl ReflexConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ReflexConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| ReflexError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.general.events_buffer_size == 0 {
            return Err(ReflexError::Config(
                "general.events_buffer_size must be at least 1".to_string(),
            ));
        }
        if self.script.instruction_limit == 0 {
            return Err(ReflexError::Config(
                "script.instruction_limit must be at least 1".to_string(),
            ));
        }
        if self.script.memory_limit < 1024 * 1024 {
            return Err(ReflexError::Config(
                "script.memory_limit must be at least 1 MiB".to_string(),
            ));
        }
        Ok(())
    }
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    /// Capacity of the inbound event queue. Sources block when it is full.
    pub events_buffer_size: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            events_buffer_size: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Which registered modules to set up at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModulesConfig {
    pub event_sources: Vec<String>,
    pub action_modules: Vec<String>,
}

/// Where per-module configuration comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigProviderConfig {
    pub provider: ConfigProviderKind,
    /// Directory holding one file per module (for `localfiles`).
    pub path: String,
}

impl Default for ConfigProviderConfig {
    fn default() -> Self {
        Self {
            provider: ConfigProviderKind::LocalFiles,
            path: "./modules.d".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigProviderKind {
    #[default]
    LocalFiles,
    /// Every module gets an empty configuration.
    None,
}

/// Reaction persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub provider: StorageProvider,
    /// Database file (for `sqlite`).
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            provider: StorageProvider::Sqlite,
            path: "./data/reflex.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    Sqlite,
    Memory,
}

/// Script interpreter limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Instructions a single evaluation may execute before it is aborted.
    pub instruction_limit: u32,
    /// Bytes a single evaluation may allocate before it is aborted.
    pub memory_limit: usize,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            instruction_limit: 1_000_000,
            memory_limit: 64 * 1024 * 1024,
        }
    }
}

/// Management API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub enabled: bool,
    pub bind_address: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8082".to_string(),
        }
    }
}
