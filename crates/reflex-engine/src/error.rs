//! Error types for the reaction engine.

use reflex_core::PayloadError;
use reflex_script::ScriptError;

/// Errors from module registry lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("No such {kind}: {name}")]
    NotFound { kind: &'static str, name: String },
}

/// Errors reported by action modules.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Unknown action '{action}' for module '{module}'")]
    UnknownAction { module: String, action: String },
    #[error("Payload validation failed: {0}")]
    InvalidPayload(String),
    #[error("Action failed: {0}")]
    Failed(String),
    #[error("Action module setup failed: {0}")]
    Setup(String),
}

impl From<PayloadError> for ActionError {
    fn from(err: PayloadError) -> Self {
        ActionError::InvalidPayload(err.to_string())
    }
}

/// Errors reported by event sources.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid event source configuration: {0}")]
    InvalidConfig(String),
    #[error("Event source setup failed: {0}")]
    Setup(String),
    #[error("Event queue closed")]
    QueueClosed,
}

/// Errors from configuration resolvers.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("No configuration for module: {0}")]
    NotFound(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reaction store mutations and lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("No reactions matching event '{0}'")]
    NoReactionsForEvent(String),
    #[error("Reaction '{name}' not found for event '{event}'")]
    ReactionNotFound { event: String, name: String },
    #[error("Reaction '{name}' already exists for event '{event}'")]
    Duplicate { event: String, name: String },
}

/// Why a pipeline ended in the error state.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("Reaction has no step named '{0}'")]
    UnknownStep(String),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("Step '{step}' failed: {source}")]
    Action {
        step: String,
        #[source]
        source: ActionError,
    },
    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Script worker failed: {0}")]
    Worker(String),
}
