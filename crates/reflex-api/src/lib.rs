//! Reflex API crate - axum HTTP management API.
//!
//! Exposes reaction management, module introspection, dispatch counters and
//! manual event injection over JSON.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::AppState;
