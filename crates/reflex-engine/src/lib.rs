//! Reaction engine for Reflex.
//!
//! Event sources push events onto a bounded queue. The dispatcher matches
//! each event against the reaction store and runs one pipeline per matching
//! reaction; decision scripts choose which action module step runs next.

pub mod builtin;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod module;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod setup;
pub mod store;

#[cfg(test)]
mod testing;

pub use builtin::register_builtins;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use engine::Engine;
pub use error::{
    ActionError, PipelineError, RegistryError, ResolveError, SourceError, StoreError,
};
pub use metrics::{EngineMetrics, MetricsSnapshot};
pub use module::{event_channel, ActionModule, Describe, EventReceiver, EventSender, EventSource};
pub use pipeline::{Pipeline, PipelineOutcome, PipelineState};
pub use registry::{ActionRegistry, ModuleRegistry, SourceRegistry};
pub use resolver::{ConfigResolver, EmptyResolver, LocalFilesResolver, StaticResolver};
pub use setup::{setup_action_modules, setup_event_sources, SetupOutcome, SetupReport};
pub use store::ReactionStore;
