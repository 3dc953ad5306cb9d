//! Test doubles shared by the engine's unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use reflex_core::{Capability, Payload};
use reflex_script::{Decision, LuaScriptEngine, ScriptEngine, ScriptError};

use crate::error::ActionError;
use crate::module::{ActionModule, Describe};
use crate::registry::ActionRegistry;

/// Action module returning `{"x": 1}` for every action except `fail`.
#[derive(Default)]
pub struct RecordingModule {
    pub calls: Mutex<Vec<(String, Payload)>>,
}

impl RecordingModule {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Describe for RecordingModule {
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new("a", vec![], vec![])]
    }
}

#[async_trait]
impl ActionModule for RecordingModule {
    async fn dispatch(&self, action: &str, input: Payload) -> Result<Payload, ActionError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), input));
        if action == "fail" {
            return Err(ActionError::Failed("simulated failure".to_string()));
        }
        Ok(payload(json!({"x": 1})))
    }
}

/// Lua engine that counts evaluations.
#[derive(Default)]
pub struct CountingEngine {
    inner: LuaScriptEngine,
    pub evaluations: AtomicUsize,
}

impl CountingEngine {
    pub fn count(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }
}

impl ScriptEngine for CountingEngine {
    fn evaluate(
        &self,
        event: &Payload,
        prior: Option<&Payload>,
        source: &str,
    ) -> Result<Decision, ScriptError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        self.inner.evaluate(event, prior, source)
    }
}

pub fn payload(value: serde_json::Value) -> Payload {
    match value {
        serde_json::Value::Object(map) => map,
        _ => panic!("expected object"),
    }
}

/// Registry with a [`RecordingModule`] registered as `m`.
pub fn registry_with_module() -> (Arc<ActionRegistry>, Arc<RecordingModule>) {
    let registry = Arc::new(ActionRegistry::for_actions());
    let module = Arc::new(RecordingModule::default());
    registry.register("m", module.clone());
    (registry, module)
}
