//! `dummy` action module, for wiring checks and debugging.

use std::str::FromStr;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use reflex_core::{ArgumentDescriptor, Capability, Payload, PayloadError, PayloadExt};

use crate::error::ActionError;
use crate::module::{ActionModule, Describe};

pub const MODULE_NAME: &str = "dummy";

/// Actions understood by [`DummyActionModule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DummyAction {
    /// Log the input and return `{"dummykey": "dummyvalue"}`.
    DummyAction,
    /// Return the input unchanged.
    Echo,
}

impl DummyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DummyAction::DummyAction => "dummy_action",
            DummyAction::Echo => "echo",
        }
    }
}

impl FromStr for DummyAction {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dummy_action" => Ok(DummyAction::DummyAction),
            "echo" => Ok(DummyAction::Echo),
            other => Err(ActionError::UnknownAction {
                module: MODULE_NAME.to_string(),
                action: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct DummyActionModule;

impl Describe for DummyActionModule {
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new(
                DummyAction::DummyAction.as_str(),
                vec![ArgumentDescriptor::new("string", "dummy_string")],
                vec![ArgumentDescriptor::new("string", "dummykey")],
            ),
            Capability::new(
                DummyAction::Echo.as_str(),
                vec![ArgumentDescriptor::new("object", "any")],
                vec![ArgumentDescriptor::new("object", "any")],
            ),
        ]
    }
}

#[async_trait]
impl ActionModule for DummyActionModule {
    async fn setup(&self, config: &[u8]) -> Result<(), ActionError> {
        info!(
            module = MODULE_NAME,
            config = %String::from_utf8_lossy(config),
            "Dummy action module configured"
        );
        Ok(())
    }

    async fn dispatch(&self, action: &str, input: Payload) -> Result<Payload, ActionError> {
        match action.parse::<DummyAction>()? {
            DummyAction::DummyAction => {
                // `dummy_string` is optional, but must be a string when given.
                let dummy_string = match input.get_str("dummy_string") {
                    Ok(s) => Some(s),
                    Err(PayloadError::Missing(_)) => None,
                    Err(e) => return Err(e.into()),
                };
                info!(module = MODULE_NAME, action, dummy_string, data = ?input, "Dummy action received");
                let mut output = Payload::new();
                output.insert("dummykey".to_string(), Value::from("dummyvalue"));
                Ok(output)
            }
            DummyAction::Echo => Ok(input),
        }
    }
}
