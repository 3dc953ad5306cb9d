//! Per-module configuration lookup.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ResolveError;

/// Supplies raw configuration bytes for a module by name.
///
/// One resolver serves both action modules and event sources. It is only
/// consulted during setup.
#[async_trait]
pub trait ConfigResolver: Send + Sync {
    async fn get_config(&self, module: &str) -> Result<Vec<u8>, ResolveError>;
}

/// Reads module configuration from a directory of files.
///
/// The configuration of module `mail` is the first file, in file name order,
/// whose stem equals `mail`, compared case-insensitively. The extension is
/// ignored, so `Mail.yaml` and `mail.toml` both match.
#[derive(Debug, Clone)]
pub struct LocalFilesResolver {
    dir: PathBuf,
}

impl LocalFilesResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ConfigResolver for LocalFilesResolver {
    async fn get_config(&self, module: &str) -> Result<Vec<u8>, ResolveError> {
        let wanted = module.to_lowercase();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            let matches = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.to_lowercase() == wanted);
            if matches {
                candidates.push((entry.file_name(), path));
            }
        }
        candidates.sort();

        if let Some((_, path)) = candidates.into_iter().next() {
            debug!(module = %module, path = %path.display(), "Found module configuration");
            return Ok(tokio::fs::read(&path).await?);
        }

        Err(ResolveError::NotFound(module.to_string()))
    }
}

/// In-memory resolver, for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    configs: HashMap<String, Vec<u8>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, module: impl Into<String>, config: impl Into<Vec<u8>>) -> Self {
        self.configs.insert(module.into(), config.into());
        self
    }
}

#[async_trait]
impl ConfigResolver for StaticResolver {
    async fn get_config(&self, module: &str) -> Result<Vec<u8>, ResolveError> {
        self.configs
            .get(module)
            .cloned()
            .ok_or_else(|| ResolveError::NotFound(module.to_string()))
    }
}

/// Gives every module an empty configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

#[async_trait]
impl ConfigResolver for EmptyResolver {
    async fn get_config(&self, _module: &str) -> Result<Vec<u8>, ResolveError> {
        Ok(Vec::new())
    }
}
