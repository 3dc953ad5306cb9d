//! One live execution of a reaction in response to one event.
//!
//! The entry script picks the first step. Each step dispatches its action,
//! then its follow-up script (if any) picks the next step from the action's
//! output. Every script sees the same triggering event data.

pub mod state_machine;

pub use state_machine::{validate_transition, PipelineState};

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use reflex_core::{Event, Payload, PipelineStatus, Reaction};
use reflex_script::{Decision, ScriptEngine};

use crate::error::PipelineError;
use crate::registry::ActionRegistry;

/// How a pipeline ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutcome {
    pub id: Uuid,
    pub event: String,
    pub reaction: String,
    pub status: PipelineStatus,
    /// Steps whose action was dispatched successfully, in order.
    pub steps: Vec<String>,
    pub error: Option<String>,
}

/// A reaction pipeline bound to one event.
pub struct Pipeline {
    id: Uuid,
    event: Arc<Event>,
    reaction: Arc<Reaction>,
    actions: Arc<ActionRegistry>,
    scripts: Arc<dyn ScriptEngine>,
    state: PipelineState,
    completed: Vec<String>,
}

impl Pipeline {
    pub fn new(
        event: Arc<Event>,
        reaction: Arc<Reaction>,
        actions: Arc<ActionRegistry>,
        scripts: Arc<dyn ScriptEngine>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event,
            reaction,
            actions,
            scripts,
            state: PipelineState::Init,
            completed: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Run the pipeline to a terminal state.
    ///
    /// Failures end the pipeline in [`PipelineStatus::Error`]; they are
    /// logged and reported in the outcome, never returned.
    pub async fn run(mut self) -> PipelineOutcome {
        info!(
            pipeline_id = %self.id,
            event = %self.event.name,
            reaction = %self.reaction.name,
            "Pipeline started"
        );

        let (status, error) = match self.drive().await {
            Ok(status) => (status, None),
            Err(e) => {
                error!(
                    pipeline_id = %self.id,
                    event = %self.event.name,
                    reaction = %self.reaction.name,
                    state = %self.state,
                    error = %e,
                    "Pipeline failed"
                );
                if !self.state.is_terminal() {
                    self.state = PipelineState::Error;
                }
                (PipelineStatus::Error, Some(e.to_string()))
            }
        };

        info!(
            pipeline_id = %self.id,
            reaction = %self.reaction.name,
            status = %status,
            steps = self.completed.len(),
            "Pipeline finished"
        );

        PipelineOutcome {
            id: self.id,
            event: self.event.name.clone(),
            reaction: self.reaction.name.clone(),
            status,
            steps: self.completed,
            error,
        }
    }

    async fn drive(&mut self) -> Result<PipelineStatus, PipelineError> {
        self.transition(PipelineState::AwaitingScript)?;

        let entry = self.reaction.script.clone();
        let (mut next, mut input) = match self.evaluate(entry, None).await? {
            Decision::Stop => {
                self.transition(PipelineState::NotLaunched)?;
                return Ok(PipelineStatus::NotLaunched);
            }
            Decision::Continue { next, input } => (next, input),
        };

        loop {
            let step = self
                .reaction
                .step(&next)
                .cloned()
                .ok_or_else(|| PipelineError::UnknownStep(next.clone()))?;
            self.transition(PipelineState::Running(next.clone()))?;

            let module = self.actions.lookup(&step.module)?;
            debug!(
                pipeline_id = %self.id,
                step = %next,
                module = %step.module,
                action = %step.action,
                "Dispatching action"
            );
            let output = module
                .dispatch(&step.action, input)
                .await
                .map_err(|source| PipelineError::Action {
                    step: next.clone(),
                    source,
                })?;
            self.completed.push(next.clone());

            if step.script.is_empty() {
                self.transition(PipelineState::Done)?;
                return Ok(PipelineStatus::Done);
            }

            match self.evaluate(step.script, Some(output)).await? {
                Decision::Stop => {
                    self.transition(PipelineState::Done)?;
                    return Ok(PipelineStatus::Done);
                }
                Decision::Continue {
                    next: following,
                    input: data,
                } => {
                    next = following;
                    input = data;
                }
            }
        }
    }

    /// Evaluate `source` on the blocking pool against the triggering event.
    async fn evaluate(
        &self,
        source: String,
        prior: Option<Payload>,
    ) -> Result<Decision, PipelineError> {
        let scripts = Arc::clone(&self.scripts);
        let event = Arc::clone(&self.event);
        let decision = tokio::task::spawn_blocking(move || {
            scripts.evaluate(&event.data, prior.as_ref(), &source)
        })
        .await
        .map_err(|e| PipelineError::Worker(e.to_string()))??;

        debug!(
            pipeline_id = %self.id,
            next = decision.next_step().unwrap_or(""),
            "Script decided"
        );
        Ok(decision)
    }

    fn transition(&mut self, to: PipelineState) -> Result<(), PipelineError> {
        validate_transition(&self.state, &to)?;
        self.state = to;
        Ok(())
    }
}
