//! Integration tests for the Reflex management API.
//!
//! Each test drives a fresh router with its own in-memory database and
//! engine, with the built-in modules registered.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use reflex_api::handlers::{DispatchResponse, HealthResponse, ModulesResponse};
use reflex_api::{create_router, AppState};
use reflex_core::Reaction;
use reflex_engine::{register_builtins, ActionRegistry, Engine, MetricsSnapshot, SourceRegistry};
use reflex_script::LuaScriptEngine;
use reflex_storage::{Database, ReactionPersistence, ReactionRepository};

// =============================================================================
// Helpers
// =============================================================================

fn make_state() -> AppState {
    let actions = Arc::new(ActionRegistry::for_actions());
    let sources = Arc::new(SourceRegistry::for_sources());
    register_builtins(&actions, &sources);
    let engine = Arc::new(Engine::new(
        actions,
        sources,
        Arc::new(LuaScriptEngine::default()),
    ));
    let repo = ReactionRepository::new(Arc::new(Database::in_memory().unwrap()));
    AppState::new(engine, Arc::new(repo))
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::delete(uri).body(Body::empty()).unwrap()
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn notify_reaction(name: &str) -> Value {
    json!({
        "name": name,
        "script": "nextAction = \"notify\"; result = {dummy_string = event.host}",
        "steps": {
            "notify": {"module": "dummy", "action": "dummy_action"}
        }
    })
}

// =============================================================================
// Introspection
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_router(make_state());
    let resp = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let health: HealthResponse = body_json(resp).await;
    assert_eq!(health.status, "healthy");
    assert_eq!(health.active_reactions, 0);
}

#[tokio::test]
async fn test_list_modules() {
    let app = create_router(make_state());
    let resp = app.oneshot(get("/v1/modules")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let modules: ModulesResponse = body_json(resp).await;
    assert_eq!(modules.action_modules, vec!["dummy"]);
    assert_eq!(modules.event_sources, vec!["dummy", "onetime"]);
}

#[tokio::test]
async fn test_list_actions_and_events() {
    let state = make_state();

    let resp = create_router(state.clone())
        .oneshot(get("/v1/actions"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let actions: Value = body_json(resp).await;
    assert_eq!(actions["dummy"][0]["name"], "dummy_action");
    assert_eq!(actions["dummy"][0]["data_in"][0]["type"], "string");

    let resp = create_router(state).oneshot(get("/v1/events")).await.unwrap();
    let events: Value = body_json(resp).await;
    assert_eq!(events["onetime"][0]["name"], "onetime");
}

// =============================================================================
// Reactions
// =============================================================================

#[tokio::test]
async fn test_create_get_and_list_reaction() {
    let state = make_state();

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &notify_reaction("r1")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Reaction = body_json(resp).await;
    assert_eq!(created.event, "alert");
    assert_eq!(created.steps["notify"].name, "notify");

    let resp = create_router(state.clone())
        .oneshot(get("/v1/events/alert/reactions/r1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Reaction = body_json(resp).await;
    assert_eq!(fetched, created);

    let resp = create_router(state.clone())
        .oneshot(get("/v1/events/alert/reactions"))
        .await
        .unwrap();
    let list: Vec<Reaction> = body_json(resp).await;
    assert_eq!(list.len(), 1);

    let resp = create_router(state.clone())
        .oneshot(get("/v1/reactions"))
        .await
        .unwrap();
    let persisted: Vec<Reaction> = body_json(resp).await;
    assert_eq!(persisted, vec![created]);
}

#[tokio::test]
async fn test_list_reactions_filtered_by_event() {
    let state = make_state();
    for (event, name) in [("alert", "r1"), ("alert", "r2"), ("deploy", "r1")] {
        let resp = create_router(state.clone())
            .oneshot(post_json(
                &format!("/v1/events/{event}/reactions"),
                &notify_reaction(name),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = create_router(state.clone())
        .oneshot(get("/v1/reactions?event=alert"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let alert: Vec<Reaction> = body_json(resp).await;
    assert_eq!(alert.len(), 2);
    assert!(alert.iter().all(|r| r.event == "alert"));

    let resp = create_router(state.clone())
        .oneshot(get("/v1/reactions?event=quiet"))
        .await
        .unwrap();
    let quiet: Vec<Reaction> = body_json(resp).await;
    assert!(quiet.is_empty());

    let resp = create_router(state).oneshot(get("/v1/reactions")).await.unwrap();
    let all: Vec<Reaction> = body_json(resp).await;
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn test_path_event_overrides_body() {
    let state = make_state();
    let mut body = notify_reaction("r1");
    body["event"] = json!("something_else");

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert!(state.persistence.get("alert", "r1").unwrap().is_some());
    assert!(state.engine.reactions_for("something_else").is_empty());
}

#[tokio::test]
async fn test_duplicate_reaction_conflicts() {
    let state = make_state();
    let body = notify_reaction("r1");

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let err: Value = body_json(resp).await;
    assert_eq!(err["error"], "conflict");
    assert_eq!(state.engine.reactions_for("alert").len(), 1);
}

#[tokio::test]
async fn test_create_rejects_invalid_reaction() {
    let state = make_state();

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &notify_reaction("  ")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = json!({
        "name": "r1",
        "script": "",
        "steps": {"notify": {"module": "", "action": "dummy_action"}}
    });
    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(state.persistence.all().unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_reaction() {
    let state = make_state();
    create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &notify_reaction("r1")))
        .await
        .unwrap();

    let resp = create_router(state.clone())
        .oneshot(delete("/v1/events/alert/reactions/r1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(state.persistence.get("alert", "r1").unwrap().is_none());

    let resp = create_router(state.clone())
        .oneshot(get("/v1/events/alert/reactions/r1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = create_router(state)
        .oneshot(delete("/v1/events/alert/reactions/r1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let err: Value = body_json(resp).await;
    assert_eq!(err["error"], "not_found");
}

#[tokio::test]
async fn test_get_unknown_reaction() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(get("/v1/events/nothing/reactions/r1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Dispatch
// =============================================================================

#[tokio::test]
async fn test_dispatch_runs_reaction() {
    let state = make_state();
    create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/reactions", &notify_reaction("r1")))
        .await
        .unwrap();

    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/alert/dispatch", &json!({"host": "db-1"})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let dispatched: DispatchResponse = body_json(resp).await;
    assert_eq!(dispatched.matched, 1);

    for _ in 0..100 {
        if state.engine.metrics().pipelines_done == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let resp = create_router(state)
        .oneshot(get("/v1/stats"))
        .await
        .unwrap();
    let stats: MetricsSnapshot = body_json(resp).await;
    assert_eq!(stats.events_received, 1);
    assert_eq!(stats.events_matched, 1);
    assert_eq!(stats.pipelines_done, 1);
}

#[tokio::test]
async fn test_dispatch_unmatched_event() {
    let state = make_state();
    let resp = create_router(state.clone())
        .oneshot(post_json("/v1/events/quiet/dispatch", &json!({})))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let dispatched: DispatchResponse = body_json(resp).await;
    assert_eq!(dispatched.matched, 0);
    assert_eq!(state.engine.metrics().events_unmatched, 1);
}

#[tokio::test]
async fn test_dispatch_rejects_non_object_body() {
    let app = create_router(make_state());
    let resp = app
        .oneshot(post_json("/v1/events/alert/dispatch", &json!([1, 2])))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}
