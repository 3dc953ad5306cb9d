//! Startup activation of configured modules.
//!
//! Every module gets its own task: it resolves its configuration and calls
//! the module's setup entry point. A missing module, an unresolvable
//! configuration or a failing setup is logged and never stops the others.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::module::EventSender;
use crate::registry::{ActionRegistry, SourceRegistry};
use crate::resolver::ConfigResolver;

/// Result of one module's setup task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOutcome {
    pub module: String,
    /// `None` on success, the logged failure otherwise.
    pub error: Option<String>,
}

impl SetupOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Handles to the setup tasks started by one coordinator call.
#[derive(Debug)]
pub struct SetupReport {
    handles: Vec<JoinHandle<SetupOutcome>>,
    /// Requested names absent from the registry.
    pub skipped: Vec<String>,
}

impl SetupReport {
    pub fn started(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every started setup task.
    pub async fn join(self) -> Vec<SetupOutcome> {
        let mut outcomes = Vec::with_capacity(self.handles.len());
        for handle in self.handles {
            match handle.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(error = %e, "Module setup task panicked"),
            }
        }
        outcomes
    }
}

/// Fetch the configuration for `module`, degrading to empty bytes.
async fn resolve_or_empty(resolver: &dyn ConfigResolver, module: &str) -> Vec<u8> {
    match resolver.get_config(module).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(module = %module, error = %e, "No configuration found, using empty configuration");
            Vec::new()
        }
    }
}

/// Set up the named action modules concurrently.
pub fn setup_action_modules(
    registry: &ActionRegistry,
    resolver: Arc<dyn ConfigResolver>,
    names: &[String],
) -> SetupReport {
    let mut handles = Vec::new();
    let mut skipped = Vec::new();

    for name in names {
        let module = match registry.lookup(name) {
            Ok(module) => module,
            Err(e) => {
                error!(module = %name, error = %e, "Cannot set up action module");
                skipped.push(name.clone());
                continue;
            }
        };

        let resolver = Arc::clone(&resolver);
        let name = name.clone();
        handles.push(tokio::spawn(async move {
            let config = resolve_or_empty(resolver.as_ref(), &name).await;
            let error = match module.setup(&config).await {
                Ok(()) => {
                    info!(module = %name, "Action module ready");
                    None
                }
                Err(e) => {
                    error!(module = %name, error = %e, "Action module setup failed");
                    Some(e.to_string())
                }
            };
            SetupOutcome {
                module: name,
                error,
            }
        }));
    }

    SetupReport { handles, skipped }
}

/// Set up the named event sources concurrently, handing each a clone of the
/// inbound event sender.
pub fn setup_event_sources(
    registry: &SourceRegistry,
    resolver: Arc<dyn ConfigResolver>,
    names: &[String],
    events: &EventSender,
) -> SetupReport {
    let mut handles = Vec::new();
    let mut skipped = Vec::new();

    for name in names {
        let source = match registry.lookup(name) {
            Ok(source) => source,
            Err(e) => {
                error!(source = %name, error = %e, "Cannot set up event source");
                skipped.push(name.clone());
                continue;
            }
        };

        let resolver = Arc::clone(&resolver);
        let events = events.clone();
        let name = name.clone();
        handles.push(tokio::spawn(async move {
            let config = resolve_or_empty(resolver.as_ref(), &name).await;
            let error = match source.setup(events, &config).await {
                Ok(()) => {
                    info!(source = %name, "Event source ready");
                    None
                }
                Err(e) => {
                    error!(source = %name, error = %e, "Event source setup failed");
                    Some(e.to_string())
                }
            };
            SetupOutcome {
                module: name,
                error,
            }
        }));
    }

    SetupReport { handles, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ActionError, SourceError};
    use crate::module::{event_channel, ActionModule, Describe, EventSource};
    use crate::resolver::StaticResolver;
    use async_trait::async_trait;
    use reflex_core::{Capability, Event, Payload};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records the configuration it was set up with.
    #[derive(Default)]
    struct Recording {
        seen: Mutex<Option<Vec<u8>>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl Describe for Recording {
        fn capabilities(&self) -> Vec<Capability> {
            Vec::new()
        }
    }

    #[async_trait]
    impl ActionModule for Recording {
        async fn setup(&self, config: &[u8]) -> Result<(), ActionError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            *self.seen.lock().unwrap() = Some(config.to_vec());
            if self.fail {
                return Err(ActionError::Setup("bad credentials".to_string()));
            }
            Ok(())
        }

        async fn dispatch(&self, _action: &str, input: Payload) -> Result<Payload, ActionError> {
            Ok(input)
        }
    }

    struct Emitting;

    impl Describe for Emitting {
        fn capabilities(&self) -> Vec<Capability> {
            Vec::new()
        }
    }

    #[async_trait]
    impl EventSource for Emitting {
        async fn setup(&self, events: EventSender, config: &[u8]) -> Result<(), SourceError> {
            let mut data = Payload::new();
            data.insert(
                "config".to_string(),
                String::from_utf8_lossy(config).into_owned().into(),
            );
            events
                .send(Event::new("emitted", data))
                .await
                .map_err(|_| SourceError::QueueClosed)
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_setup_passes_resolved_config() {
        let registry = ActionRegistry::for_actions();
        let module = Arc::new(Recording::default());
        registry.register("m", module.clone());
        let resolver: Arc<dyn ConfigResolver> = Arc::new(StaticResolver::new().with("m", "cfg"));

        let outcomes = setup_action_modules(&registry, resolver, &names(&["m"]))
            .join()
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_ok());
        assert_eq!(module.seen.lock().unwrap().as_deref(), Some(&b"cfg"[..]));
    }

    #[tokio::test]
    async fn test_resolver_failure_degrades_to_empty_config() {
        let registry = ActionRegistry::for_actions();
        let module = Arc::new(Recording::default());
        registry.register("m", module.clone());
        let resolver: Arc<dyn ConfigResolver> = Arc::new(StaticResolver::new());

        let outcomes = setup_action_modules(&registry, resolver, &names(&["m"]))
            .join()
            .await;

        assert!(outcomes[0].is_ok());
        assert_eq!(module.seen.lock().unwrap().as_deref(), Some(&b""[..]));
    }

    #[tokio::test]
    async fn test_missing_module_is_skipped() {
        let registry = ActionRegistry::for_actions();
        registry.register("m", Arc::new(Recording::default()));
        let resolver: Arc<dyn ConfigResolver> = Arc::new(StaticResolver::new());

        let report = setup_action_modules(&registry, resolver, &names(&["ghost", "m"]));
        assert_eq!(report.skipped, vec!["ghost".to_string()]);
        assert_eq!(report.started(), 1);
        let outcomes = report.join().await;
        assert_eq!(outcomes[0].module, "m");
    }

    #[tokio::test]
    async fn test_failing_setup_does_not_block_others() {
        let registry = ActionRegistry::for_actions();
        let failing = Arc::new(Recording {
            fail: true,
            ..Recording::default()
        });
        let slow = Arc::new(Recording {
            delay: Some(Duration::from_millis(20)),
            ..Recording::default()
        });
        registry.register("failing", failing);
        registry.register("slow", slow.clone());
        let resolver: Arc<dyn ConfigResolver> = Arc::new(StaticResolver::new());

        let outcomes = setup_action_modules(&registry, resolver, &names(&["failing", "slow"]))
            .join()
            .await;

        assert_eq!(outcomes.len(), 2);
        let failing = outcomes.iter().find(|o| o.module == "failing").unwrap();
        assert!(failing.error.as_deref().unwrap().contains("bad credentials"));
        let slow_outcome = outcomes.iter().find(|o| o.module == "slow").unwrap();
        assert!(slow_outcome.is_ok());
        assert!(slow.seen.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_event_source_setup_receives_sender() {
        let registry = SourceRegistry::for_sources();
        registry.register("emitting", Arc::new(Emitting));
        let resolver: Arc<dyn ConfigResolver> =
            Arc::new(StaticResolver::new().with("emitting", "hello"));
        let (tx, mut rx) = event_channel(4);

        let outcomes = setup_event_sources(&registry, resolver, &names(&["emitting"]), &tx)
            .join()
            .await;
        assert!(outcomes[0].is_ok());

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, "emitted");
        assert_eq!(event.data["config"], "hello");
    }
}
