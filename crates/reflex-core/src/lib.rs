pub mod config;
pub mod error;
pub mod payload;
pub mod types;

pub use config::ReflexConfig;
pub use error::{ReflexError, Result};
pub use payload::{Payload, PayloadError, PayloadExt};
pub use types::*;
