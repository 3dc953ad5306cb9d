//! `dummy` event source: random events at random intervals.
//!
//! Optional JSON configuration: `{"max_interval_ms": 10000}`.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info};

use reflex_core::{ArgumentDescriptor, Capability, Event, Payload};

use crate::error::SourceError;
use crate::module::{Describe, EventSender, EventSource};

pub const SOURCE_NAME: &str = "dummy";

const DEFAULT_MAX_INTERVAL_MS: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DummySourceConfig {
    pub max_interval_ms: u64,
}

impl Default for DummySourceConfig {
    fn default() -> Self {
        Self {
            max_interval_ms: DEFAULT_MAX_INTERVAL_MS,
        }
    }
}

impl DummySourceConfig {
    /// Parse the raw module configuration. Empty bytes mean defaults.
    pub fn parse(config: &[u8]) -> Result<Self, SourceError> {
        if config.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        let parsed: Self = serde_json::from_slice(config)
            .map_err(|e| SourceError::InvalidConfig(e.to_string()))?;
        if parsed.max_interval_ms == 0 {
            return Err(SourceError::InvalidConfig(
                "max_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(parsed)
    }
}

#[derive(Debug, Default)]
pub struct RandomEventSource;

impl Describe for RandomEventSource {
    fn capabilities(&self) -> Vec<Capability> {
        vec![
            Capability::new(
                "dummy_event",
                vec![
                    ArgumentDescriptor::new("int", "dummy_id"),
                    ArgumentDescriptor::new("string", "dummy_date"),
                    ArgumentDescriptor::new("string", "dummy_host"),
                ],
                vec![],
            ),
            Capability::new(
                "dummy_event_2",
                vec![
                    ArgumentDescriptor::new("int", "dummy_id"),
                    ArgumentDescriptor::new("string", "dummy_date"),
                    ArgumentDescriptor::new("string", "dummy_string"),
                ],
                vec![],
            ),
        ]
    }
}

/// Build one random event. Kept synchronous so the thread-local RNG never
/// lives across an await point.
fn random_event() -> Event {
    let mut rng = rand::rng();
    let mut data = Payload::new();
    data.insert("dummy_id".to_string(), Value::from(rng.random::<u32>()));
    data.insert(
        "dummy_date".to_string(),
        Value::from(chrono::Utc::now().to_rfc3339()),
    );
    if rng.random_bool(0.5) {
        data.insert(
            "dummy_host".to_string(),
            Value::from(rng.random::<u32>().to_string()),
        );
        Event::new("dummy_event", data)
    } else {
        data.insert(
            "dummy_string".to_string(),
            Value::from(rng.random::<u32>().to_string()),
        );
        Event::new("dummy_event_2", data)
    }
}

fn random_delay(max_interval_ms: u64) -> Duration {
    Duration::from_millis(rand::rng().random_range(0..max_interval_ms))
}

#[async_trait]
impl EventSource for RandomEventSource {
    async fn setup(&self, events: EventSender, config: &[u8]) -> Result<(), SourceError> {
        let config = DummySourceConfig::parse(config)?;
        info!(
            source = SOURCE_NAME,
            max_interval_ms = config.max_interval_ms,
            "Dummy event generator started"
        );

        tokio::spawn(async move {
            loop {
                tokio::time::sleep(random_delay(config.max_interval_ms)).await;
                let event = random_event();
                debug!(source = SOURCE_NAME, event = %event.name, "Generated event");
                if events.send(event).await.is_err() {
                    info!(source = SOURCE_NAME, "Event queue closed, generator stopped");
                    break;
                }
            }
        });
        Ok(())
    }
}
