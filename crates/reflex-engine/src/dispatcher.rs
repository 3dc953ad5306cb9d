//! Event dispatch: match an event against the reaction store and launch one
//! pipeline per matching reaction.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use reflex_core::Event;
use reflex_script::ScriptEngine;

use crate::metrics::EngineMetrics;
use crate::module::EventReceiver;
use crate::pipeline::{Pipeline, PipelineOutcome};
use crate::registry::ActionRegistry;
use crate::store::ReactionStore;

/// What dispatching one event started.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// No reaction is registered for the event.
    Unmatched,
    /// One running pipeline per matching reaction.
    Launched(Vec<JoinHandle<PipelineOutcome>>),
}

impl DispatchOutcome {
    pub fn launched(&self) -> usize {
        match self {
            DispatchOutcome::Unmatched => 0,
            DispatchOutcome::Launched(handles) => handles.len(),
        }
    }

    /// Wait for every launched pipeline. Pipelines that panicked are
    /// dropped from the result.
    pub async fn join(self) -> Vec<PipelineOutcome> {
        let handles = match self {
            DispatchOutcome::Unmatched => return Vec::new(),
            DispatchOutcome::Launched(handles) => handles,
        };
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(outcome) = handle.await {
                outcomes.push(outcome);
            }
        }
        outcomes
    }
}

/// Matches events to reactions and spawns their pipelines.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<ReactionStore>,
    actions: Arc<ActionRegistry>,
    scripts: Arc<dyn ScriptEngine>,
    metrics: Arc<EngineMetrics>,
}

impl Dispatcher {
    pub fn new(
        store: Arc<ReactionStore>,
        actions: Arc<ActionRegistry>,
        scripts: Arc<dyn ScriptEngine>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            store,
            actions,
            scripts,
            metrics,
        }
    }

    /// Launch one pipeline per reaction registered for `event`.
    ///
    /// Does not wait for the pipelines; the returned handles may be awaited
    /// or dropped.
    pub fn dispatch(&self, event: Event) -> DispatchOutcome {
        self.metrics.record_received();
        info!(event = %event.name, "Event received");

        let reactions = self.store.matches_for(&event.name);
        if reactions.is_empty() {
            self.metrics.record_match(false);
            info!(event = %event.name, "Event matched no reaction");
            return DispatchOutcome::Unmatched;
        }
        self.metrics.record_match(true);
        info!(event = %event.name, reactions = reactions.len(), "Event matched");

        let event = Arc::new(event);
        let handles = reactions
            .into_iter()
            .map(|reaction| {
                let pipeline = Pipeline::new(
                    Arc::clone(&event),
                    reaction,
                    Arc::clone(&self.actions),
                    Arc::clone(&self.scripts),
                );
                let metrics = Arc::clone(&self.metrics);
                tokio::spawn(async move {
                    let outcome = pipeline.run().await;
                    metrics.record_pipeline(outcome.status);
                    outcome
                })
            })
            .collect();

        DispatchOutcome::Launched(handles)
    }

    /// Consume the inbound queue until every sender is dropped.
    ///
    /// Each event is dispatched on its own task so a slow reaction never
    /// delays the next event.
    pub async fn run(self, mut events: EventReceiver) {
        info!("Event loop started");
        while let Some(event) = events.recv().await {
            debug!(event = %event.name, "Event dequeued");
            let dispatcher = self.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(event);
            });
        }
        info!("Event queue closed, event loop stopped");
    }
}
