//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use reflex_engine::Engine;
use reflex_storage::ReactionPersistence;

/// Shared application state.
///
/// All fields use `Arc` for cheap cloning across handler tasks.
#[derive(Clone)]
pub struct AppState {
    /// The running reaction engine.
    pub engine: Arc<Engine>,
    /// Durable mirror of the engine's reaction store.
    pub persistence: Arc<dyn ReactionPersistence>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: Arc<Engine>, persistence: Arc<dyn ReactionPersistence>) -> Self {
        Self {
            engine,
            persistence,
            start_time: Instant::now(),
        }
    }
}
