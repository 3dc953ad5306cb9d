use thiserror::Error;

/// Top-level error type for the Reflex system.
///
/// Subsystem crates define their own error types for the failures they own
/// (scripts, registries, the reaction store) and convert into this type only
/// where the failure crosses into process-level plumbing such as
/// configuration loading and persistence.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReflexError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Reaction already exists: {event}/{name}")]
    Conflict { event: String, name: String },

    #[error("Reaction not found: {event}/{name}")]
    NotFound { event: String, name: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ReflexError {
    fn from(err: toml::de::Error) -> Self {
        ReflexError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ReflexError {
    fn from(err: toml::ser::Error) -> Self {
        ReflexError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ReflexError {
    fn from(err: serde_json::Error) -> Self {
        ReflexError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Reflex operations.
pub type Result<T> = std::result::Result<T, ReflexError>;
