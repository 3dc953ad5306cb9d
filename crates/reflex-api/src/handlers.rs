//! Route handler functions for all API endpoints.
//!
//! Each handler extracts path parameters and JSON bodies via axum
//! extractors, calls the engine or the reaction persistence, and returns
//! JSON responses.

use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use reflex_core::{Capability, Event, Payload, Reaction};
use reflex_engine::{MetricsSnapshot, StoreError};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Query parameter types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ReactionFilter {
    /// Only reactions bound to this event.
    pub event: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_reactions: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModulesResponse {
    pub action_modules: Vec<String>,
    pub event_sources: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DispatchResponse {
    pub event: String,
    /// Number of pipelines launched.
    pub matched: usize,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_reactions: state.engine.store().len() as u64,
    })
}

/// GET /v1/reactions?event= - persisted reactions, optionally for one event.
pub async fn list_reactions(
    State(state): State<AppState>,
    Query(filter): Query<ReactionFilter>,
) -> Result<Json<Vec<Reaction>>, ApiError> {
    let reactions = match filter.event {
        Some(event) => state.persistence.for_event(&event)?,
        None => state.persistence.all()?,
    };
    Ok(Json(reactions))
}

/// GET /v1/actions - capabilities of every action module.
pub async fn list_actions(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, Vec<Capability>>> {
    Json(state.engine.describe_actions())
}

/// GET /v1/events - capabilities of every event source.
pub async fn list_events(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, Vec<Capability>>> {
    Json(state.engine.describe_events())
}

/// GET /v1/modules
pub async fn list_modules(State(state): State<AppState>) -> Json<ModulesResponse> {
    Json(ModulesResponse {
        action_modules: state.engine.action_module_names(),
        event_sources: state.engine.event_source_names(),
    })
}

/// GET /v1/stats
pub async fn stats(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.engine.metrics())
}

/// GET /v1/events/{event}/reactions - active reactions for one event.
pub async fn event_reactions(
    State(state): State<AppState>,
    Path(event): Path<String>,
) -> Json<Vec<Reaction>> {
    let reactions = state
        .engine
        .reactions_for(&event)
        .iter()
        .map(|r| r.as_ref().clone())
        .collect();
    Json(reactions)
}

/// POST /v1/events/{event}/reactions
///
/// Persists the reaction, then activates it. The path event wins over any
/// event named in the body.
pub async fn create_reaction(
    State(state): State<AppState>,
    Path(event): Path<String>,
    Json(mut reaction): Json<Reaction>,
) -> Result<(StatusCode, Json<Reaction>), ApiError> {
    if reaction.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Reaction name must not be empty".to_string()));
    }
    if let Some((key, step)) = reaction
        .steps
        .iter()
        .find(|(_, step)| step.module.is_empty() || step.action.is_empty())
    {
        return Err(ApiError::BadRequest(format!(
            "Step '{}' must name a module and an action (got module '{}', action '{}')",
            key, step.module, step.action
        )));
    }
    reaction.event = event;
    let reaction = reaction.normalize();

    state.persistence.create(&reaction)?;
    if let Err(e) = state.engine.add_reaction(reaction.clone()) {
        // Keep the mirror consistent with the store.
        if let Err(rollback) = state.persistence.delete(&reaction.event, &reaction.name) {
            warn!(error = %rollback, "Failed to roll back persisted reaction");
        }
        return Err(e.into());
    }

    info!(event = %reaction.event, reaction = %reaction.name, "Reaction created via API");
    Ok((StatusCode::CREATED, Json(reaction)))
}

/// GET /v1/events/{event}/reactions/{reaction}
pub async fn get_reaction(
    State(state): State<AppState>,
    Path((event, name)): Path<(String, String)>,
) -> Result<Json<Reaction>, ApiError> {
    let reaction = state.engine.reaction(&event, &name)?;
    Ok(Json(reaction.as_ref().clone()))
}

/// DELETE /v1/events/{event}/reactions/{reaction}
///
/// Deactivates the reaction, then drops it from persistence. Pipelines
/// already running keep running.
pub async fn delete_reaction(
    State(state): State<AppState>,
    Path((event, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    match state.engine.remove_reaction(&event, &name) {
        Ok(_) => {}
        Err(e @ (StoreError::NoReactionsForEvent(_) | StoreError::ReactionNotFound { .. })) => {
            // Not active; it may still linger in persistence.
            if state.persistence.get(&event, &name)?.is_none() {
                return Err(e.into());
            }
        }
        Err(e) => return Err(e.into()),
    }

    match state.persistence.delete(&event, &name) {
        Ok(()) => {}
        Err(reflex_core::ReflexError::NotFound { .. }) => {
            warn!(event = %event, reaction = %name, "Reaction was active but not persisted");
        }
        Err(e) => return Err(e.into()),
    }

    info!(event = %event, reaction = %name, "Reaction deleted via API");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/events/{event}/dispatch - inject an event with the body as its
/// data.
pub async fn dispatch_event(
    State(state): State<AppState>,
    Path(event): Path<String>,
    Json(data): Json<Payload>,
) -> (StatusCode, Json<DispatchResponse>) {
    let outcome = state.engine.dispatch(Event::new(event.clone(), data));
    (
        StatusCode::ACCEPTED,
        Json(DispatchResponse {
            event,
            matched: outcome.launched(),
        }),
    )
}
