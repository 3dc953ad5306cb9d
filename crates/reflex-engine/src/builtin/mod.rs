//! Modules shipped with the engine.

pub mod dummy_action;
pub mod dummy_source;
pub mod onetime;

use std::sync::Arc;

use crate::registry::{ActionRegistry, SourceRegistry};

pub use dummy_action::DummyActionModule;
pub use dummy_source::RandomEventSource;
pub use onetime::OneTimeSource;

/// Register every built-in module. Called once at startup, before setup.
pub fn register_builtins(actions: &ActionRegistry, sources: &SourceRegistry) {
    actions.register(dummy_action::MODULE_NAME, Arc::new(DummyActionModule));
    sources.register(onetime::SOURCE_NAME, Arc::new(OneTimeSource));
    sources.register(dummy_source::SOURCE_NAME, Arc::new(RandomEventSource));
}
