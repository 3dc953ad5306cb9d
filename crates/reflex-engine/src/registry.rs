//! Name-to-module registries.
//!
//! One registry holds action modules, another holds event sources. Both are
//! filled by explicit `register` calls at startup and read concurrently by
//! setup and dispatch afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use tracing::{debug, warn};

use reflex_core::Capability;

use crate::error::RegistryError;
use crate::module::{ActionModule, Describe, EventSource};

/// Registry of action modules.
pub type ActionRegistry = ModuleRegistry<dyn ActionModule>;

/// Registry of event sources.
pub type SourceRegistry = ModuleRegistry<dyn EventSource>;

/// Thread-safe map from module name to a shared module implementation.
pub struct ModuleRegistry<M: ?Sized> {
    kind: &'static str,
    modules: RwLock<HashMap<String, Arc<M>>>,
}

impl ModuleRegistry<dyn ActionModule> {
    pub fn for_actions() -> Self {
        Self::new("action module")
    }
}

impl ModuleRegistry<dyn EventSource> {
    pub fn for_sources() -> Self {
        Self::new("event source")
    }
}

impl<M: ?Sized + Describe> ModuleRegistry<M> {
    /// Create an empty registry. `kind` names the module kind in errors
    /// and logs.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            modules: RwLock::new(HashMap::new()),
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Register `module` under `name`.
    ///
    /// Registering a name twice replaces the earlier module; the replaced
    /// module is returned.
    pub fn register(&self, name: impl Into<String>, module: Arc<M>) -> Option<Arc<M>> {
        let name = name.into();
        let mut modules = self
            .modules
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = modules.insert(name.clone(), module);
        if previous.is_some() {
            warn!(kind = self.kind, module = %name, "Module registered twice, replacing");
        } else {
            debug!(kind = self.kind, module = %name, "Module registered");
        }
        previous
    }

    /// Look up a module by name.
    ///
    /// The read lock is released before returning, so callers may hold the
    /// module across await points.
    pub fn lookup(&self, name: &str) -> Result<Arc<M>, RegistryError> {
        let modules = self
            .modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        modules
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound {
                kind: self.kind,
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(name)
    }

    /// Registered module names, sorted.
    pub fn names(&self) -> Vec<String> {
        let modules = self
            .modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Capabilities of every registered module, keyed by module name.
    pub fn describe_all(&self) -> BTreeMap<String, Vec<Capability>> {
        let snapshot: Vec<(String, Arc<M>)> = {
            let modules = self
                .modules
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            modules
                .iter()
                .map(|(name, module)| (name.clone(), Arc::clone(module)))
                .collect()
        };

        snapshot
            .into_iter()
            .map(|(name, module)| {
                let mut caps = module.capabilities();
                caps.sort_by(|a, b| a.name.cmp(&b.name));
                (name, caps)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<M: ?Sized> std::fmt::Debug for ModuleRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("kind", &self.kind)
            .finish()
    }
}
