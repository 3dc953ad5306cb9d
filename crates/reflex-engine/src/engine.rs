//! The engine facade consumed by the management API and the binary.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use reflex_core::{Capability, Event, Reaction};
use reflex_script::ScriptEngine;

use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::error::StoreError;
use crate::metrics::{EngineMetrics, MetricsSnapshot};
use crate::module::{event_channel, EventReceiver, EventSender};
use crate::registry::{ActionRegistry, SourceRegistry};
use crate::resolver::ConfigResolver;
use crate::setup::{setup_action_modules, setup_event_sources, SetupOutcome};
use crate::store::ReactionStore;

/// Owns the registries, the reaction store and the dispatcher.
pub struct Engine {
    actions: Arc<ActionRegistry>,
    sources: Arc<SourceRegistry>,
    store: Arc<ReactionStore>,
    metrics: Arc<EngineMetrics>,
    dispatcher: Dispatcher,
}

impl Engine {
    pub fn new(
        actions: Arc<ActionRegistry>,
        sources: Arc<SourceRegistry>,
        scripts: Arc<dyn ScriptEngine>,
    ) -> Self {
        let store = Arc::new(ReactionStore::new());
        let metrics = Arc::new(EngineMetrics::new());
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&actions),
            scripts,
            Arc::clone(&metrics),
        );
        Self {
            actions,
            sources,
            store,
            metrics,
            dispatcher,
        }
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn store(&self) -> &ReactionStore {
        &self.store
    }

    // ---- reactions ----

    pub fn add_reaction(&self, reaction: Reaction) -> Result<Arc<Reaction>, StoreError> {
        let reaction = self.store.add(reaction.normalize())?;
        info!(event = %reaction.event, reaction = %reaction.name, "Reaction added");
        Ok(reaction)
    }

    pub fn remove_reaction(&self, event: &str, name: &str) -> Result<Arc<Reaction>, StoreError> {
        let reaction = self.store.remove(event, name)?;
        info!(event = %event, reaction = %name, "Reaction removed");
        Ok(reaction)
    }

    pub fn reactions_for(&self, event: &str) -> Vec<Arc<Reaction>> {
        self.store.matches_for(event)
    }

    pub fn reaction(&self, event: &str, name: &str) -> Result<Arc<Reaction>, StoreError> {
        self.store.get(event, name)
    }

    /// Load persisted reactions into the store. Returns how many were added.
    pub fn seed(&self, reactions: Vec<Reaction>) -> usize {
        let total = reactions.len();
        let errors = self
            .store
            .seed(reactions.into_iter().map(Reaction::normalize));
        for e in &errors {
            warn!(error = %e, "Skipping persisted reaction");
        }
        let added = total - errors.len();
        info!(reactions = added, "Reaction store seeded");
        added
    }

    // ---- dispatch ----

    pub fn dispatch(&self, event: Event) -> DispatchOutcome {
        self.dispatcher.dispatch(event)
    }

    /// Create the inbound queue and start the event loop on it.
    ///
    /// The loop stops once every clone of the returned sender is dropped.
    pub fn spawn_event_loop(&self, buffer: usize) -> (EventSender, JoinHandle<()>) {
        let (tx, rx) = event_channel(buffer);
        (tx, self.run_event_loop(rx))
    }

    pub fn run_event_loop(&self, events: EventReceiver) -> JoinHandle<()> {
        tokio::spawn(self.dispatcher.clone().run(events))
    }

    // ---- modules ----

    pub fn action_module_names(&self) -> Vec<String> {
        self.actions.names()
    }

    pub fn event_source_names(&self) -> Vec<String> {
        self.sources.names()
    }

    pub fn describe_actions(&self) -> BTreeMap<String, Vec<Capability>> {
        self.actions.describe_all()
    }

    pub fn describe_events(&self) -> BTreeMap<String, Vec<Capability>> {
        self.sources.describe_all()
    }

    /// Start setting up the configured action modules and event sources.
    ///
    /// Returns at once. The handle resolves to the per-module outcomes once
    /// every setup task has finished; dropping it leaves setup running.
    pub fn start_modules(
        &self,
        resolver: Arc<dyn ConfigResolver>,
        action_modules: &[String],
        event_sources: &[String],
        events: &EventSender,
    ) -> JoinHandle<Vec<SetupOutcome>> {
        let actions = setup_action_modules(&self.actions, Arc::clone(&resolver), action_modules);
        let sources = setup_event_sources(&self.sources, resolver, event_sources, events);

        tokio::spawn(async move {
            let mut outcomes = actions.join().await;
            outcomes.extend(sources.join().await);
            let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
            info!(
                ready = outcomes.len() - failed,
                failed,
                "Module setup finished"
            );
            outcomes
        })
    }

    // ---- metrics ----

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::register_builtins;
    use crate::resolver::StaticResolver;
    use reflex_core::{ActionStep, PipelineStatus};
    use reflex_script::LuaScriptEngine;
    use std::time::Duration;

    fn engine() -> Engine {
        let actions = Arc::new(ActionRegistry::for_actions());
        let sources = Arc::new(SourceRegistry::for_sources());
        register_builtins(&actions, &sources);
        Engine::new(actions, sources, Arc::new(LuaScriptEngine::default()))
    }

    fn dummy_reaction(event: &str, name: &str) -> Reaction {
        Reaction::new(name, event, r#"nextAction = "notify"; result = {dummy_string = "hi"}"#)
            .with_step(ActionStep::new("notify", "dummy", "dummy_action", ""))
    }

    #[tokio::test]
    async fn test_add_dispatch_remove() {
        let engine = engine();
        engine.add_reaction(dummy_reaction("e1", "r1")).unwrap();
        assert_eq!(engine.reactions_for("e1").len(), 1);

        let outcomes = engine
            .dispatch(Event::new("e1", Default::default()))
            .join()
            .await;
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, PipelineStatus::Done);

        engine.remove_reaction("e1", "r1").unwrap();
        assert!(engine.reaction("e1", "r1").is_err());
        assert!(matches!(
            engine.dispatch(Event::new("e1", Default::default())),
            DispatchOutcome::Unmatched
        ));

        let snap = engine.metrics();
        assert_eq!(snap.events_received, 2);
        assert_eq!(snap.events_matched, 1);
        assert_eq!(snap.events_unmatched, 1);
    }

    #[tokio::test]
    async fn test_add_normalizes_step_names() {
        let engine = engine();
        let mut reaction = dummy_reaction("e1", "r1");
        if let Some(step) = reaction.steps.get_mut("notify") {
            step.name.clear();
        }
        let stored = engine.add_reaction(reaction).unwrap();
        assert_eq!(stored.steps["notify"].name, "notify");
    }

    #[tokio::test]
    async fn test_seed_skips_duplicates() {
        let engine = engine();
        let added = engine.seed(vec![
            dummy_reaction("e1", "r1"),
            dummy_reaction("e1", "r1"),
            dummy_reaction("e2", "r1"),
        ]);
        assert_eq!(added, 2);
        assert_eq!(engine.store().len(), 2);
    }

    #[tokio::test]
    async fn test_module_introspection() {
        let engine = engine();
        assert_eq!(engine.action_module_names(), vec!["dummy"]);
        assert_eq!(engine.event_source_names(), vec!["dummy", "onetime"]);
        assert!(engine.describe_actions().contains_key("dummy"));
        assert!(engine.describe_events()["onetime"][0].name == "onetime");
    }

    #[tokio::test]
    async fn test_onetime_source_drives_reaction_end_to_end() {
        let engine = engine();
        engine
            .add_reaction(
                Reaction::new(
                    "on-start",
                    "onetime",
                    r#"nextAction = "echo"; result = {at = event.timestamp}"#,
                )
                .with_step(ActionStep::new("echo", "dummy", "echo", "")),
            )
            .unwrap();

        let (tx, event_loop) = engine.spawn_event_loop(8);
        let resolver: Arc<dyn ConfigResolver> = Arc::new(StaticResolver::new());
        let outcomes = engine
            .start_modules(
                resolver,
                &["dummy".to_string(), "missing".to_string()],
                &["onetime".to_string()],
                &tx,
            )
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(SetupOutcome::is_ok));
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), event_loop)
            .await
            .unwrap()
            .unwrap();
        for _ in 0..100 {
            if engine.metrics().pipelines_done == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(engine.metrics().pipelines_done, 1);
    }

    /// Never finishes its setup.
    struct StuckSource;

    impl crate::module::Describe for StuckSource {
        fn capabilities(&self) -> Vec<Capability> {
            Vec::new()
        }
    }

    #[async_trait::async_trait]
    impl crate::module::EventSource for StuckSource {
        async fn setup(
            &self,
            _events: EventSender,
            _config: &[u8],
        ) -> Result<(), crate::error::SourceError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_modules_does_not_wait_for_setup() {
        let engine = engine();
        engine.sources.register("stuck", Arc::new(StuckSource));
        engine
            .add_reaction(
                Reaction::new("on-start", "onetime", r#"nextAction = "echo"; result = {}"#)
                    .with_step(ActionStep::new("echo", "dummy", "echo", "")),
            )
            .unwrap();

        let (tx, _event_loop) = engine.spawn_event_loop(8);
        let setup = engine.start_modules(
            Arc::new(StaticResolver::new()),
            &[],
            &["stuck".to_string(), "onetime".to_string()],
            &tx,
        );

        // The onetime event is still handled while "stuck" never completes.
        for _ in 0..100 {
            if engine.metrics().pipelines_done == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(engine.metrics().pipelines_done, 1);
        assert!(!setup.is_finished());
        setup.abort();
    }
}
