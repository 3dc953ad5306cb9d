//! Traits implemented by pluggable action modules and event sources.

use async_trait::async_trait;
use tokio::sync::mpsc;

use reflex_core::{Capability, Event, Payload};

use crate::error::{ActionError, SourceError};

/// Sending half of the inbound event queue handed to event sources.
pub type EventSender = mpsc::Sender<Event>;

/// Receiving half of the inbound event queue, drained by the dispatcher.
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create the bounded inbound event queue. A full queue blocks senders.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity.max(1))
}

/// Capability query shared by every kind of module.
pub trait Describe {
    /// Actions (or events) this module declares, with their documented
    /// arguments. Used for introspection only.
    fn capabilities(&self) -> Vec<Capability>;
}

/// A module that executes named actions.
///
/// `dispatch` is the single entry point for every action of the module.
#[async_trait]
pub trait ActionModule: Describe + Send + Sync {
    /// Configure the module from its raw configuration bytes (possibly
    /// empty). Called once at startup.
    async fn setup(&self, _config: &[u8]) -> Result<(), ActionError> {
        Ok(())
    }

    /// Run `action` with `input` and return its output data.
    async fn dispatch(&self, action: &str, input: Payload) -> Result<Payload, ActionError>;
}

/// A module that produces events.
#[async_trait]
pub trait EventSource: Describe + Send + Sync {
    /// Configure the source and start pushing events on `events`.
    ///
    /// Long-running sources spawn their own task and return; the returned
    /// result only reports whether setup itself succeeded.
    async fn setup(&self, events: EventSender, config: &[u8]) -> Result<(), SourceError>;
}
