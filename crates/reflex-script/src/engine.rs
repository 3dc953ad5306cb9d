//! The decision contract between pipelines and the interpreter.

use reflex_core::Payload;

use crate::error::ScriptError;

/// Outcome of one successful script evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// No next action: the pipeline ends here.
    Stop,
    /// Run the named step with `input` as its action data.
    Continue { next: String, input: Payload },
}

impl Decision {
    pub fn next_step(&self) -> Option<&str> {
        match self {
            Decision::Stop => None,
            Decision::Continue { next, .. } => Some(next),
        }
    }
}

/// Evaluates decision scripts.
///
/// Implementations must isolate evaluations from each other: nothing a
/// script assigns may be visible to a later call. Evaluation is CPU-bound
/// and synchronous; async callers run it on a blocking thread.
pub trait ScriptEngine: Send + Sync {
    /// Run `source` with `event` bound as the triggering event data and
    /// `prior` as the previous step's output (`None` for the entry script).
    fn evaluate(
        &self,
        event: &Payload,
        prior: Option<&Payload>,
        source: &str,
    ) -> Result<Decision, ScriptError>;
}
