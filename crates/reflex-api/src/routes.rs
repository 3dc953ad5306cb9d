//! Router setup with all API routes and middleware.

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use reflex_core::error::ReflexError;

use crate::handlers;
use crate::state::AppState;

/// Create the axum Router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/reactions", get(handlers::list_reactions))
        .route("/actions", get(handlers::list_actions))
        .route("/events", get(handlers::list_events))
        .route("/modules", get(handlers::list_modules))
        .route("/stats", get(handlers::stats))
        .route(
            "/events/{event}/reactions",
            get(handlers::event_reactions).post(handlers::create_reaction),
        )
        .route(
            "/events/{event}/reactions/{reaction}",
            get(handlers::get_reaction).delete(handlers::delete_reaction),
        )
        .route("/events/{event}/dispatch", post(handlers::dispatch_event));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/v1", v1)
        .layer(DefaultBodyLimit::max(1024 * 1024)) // 1MB global limit
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `bind_address` until `shutdown` resolves.
pub async fn start_server<F>(
    bind_address: &str,
    state: AppState,
    shutdown: F,
) -> Result<(), ReflexError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);

    tracing::info!("Starting API server on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}
