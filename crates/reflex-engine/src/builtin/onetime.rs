//! `onetime` event source: emits a single event at setup.

use async_trait::async_trait;
use serde_json::Value;

use reflex_core::{ArgumentDescriptor, Capability, Event, Payload};

use crate::error::SourceError;
use crate::module::{Describe, EventSender, EventSource};

pub const SOURCE_NAME: &str = "onetime";

#[derive(Debug, Default)]
pub struct OneTimeSource;

impl Describe for OneTimeSource {
    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::new(
            SOURCE_NAME,
            vec![ArgumentDescriptor::new("timestamp string", "timestamp")],
            vec![],
        )]
    }
}

#[async_trait]
impl EventSource for OneTimeSource {
    async fn setup(&self, events: EventSender, _config: &[u8]) -> Result<(), SourceError> {
        let mut data = Payload::new();
        data.insert(
            "timestamp".to_string(),
            Value::from(chrono::Utc::now().to_rfc3339()),
        );
        events
            .send(Event::new(SOURCE_NAME, data))
            .await
            .map_err(|_| SourceError::QueueClosed)
    }
}
