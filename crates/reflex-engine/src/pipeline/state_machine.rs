//! Pipeline state machine with validated transitions.
//!
//! Init -> AwaitingScript -> Running(step) -> Done/NotLaunched/Error
//! Running(step) -> Running(next step)
//! Any non-terminal state -> Error

use std::fmt;

use reflex_core::PipelineStatus;

use crate::error::PipelineError;

/// Where one pipeline is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    /// Evaluating the reaction's entry script.
    AwaitingScript,
    /// Dispatching the named step's action, then its follow-up script.
    Running(String),
    Done,
    NotLaunched,
    Error,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PipelineState::Done | PipelineState::NotLaunched | PipelineState::Error
        )
    }

    /// Terminal status, if the state is terminal.
    pub fn status(&self) -> Option<PipelineStatus> {
        match self {
            PipelineState::Done => Some(PipelineStatus::Done),
            PipelineState::NotLaunched => Some(PipelineStatus::NotLaunched),
            PipelineState::Error => Some(PipelineStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Init => write!(f, "init"),
            PipelineState::AwaitingScript => write!(f, "awaiting script"),
            PipelineState::Running(step) => write!(f, "running({})", step),
            PipelineState::Done => write!(f, "done"),
            PipelineState::NotLaunched => write!(f, "not launched"),
            PipelineState::Error => write!(f, "error"),
        }
    }
}

/// Validate that a state transition is allowed.
///
/// Valid transitions:
/// - Init -> AwaitingScript
/// - AwaitingScript -> Running, NotLaunched
/// - Running -> Running, Done
/// - any non-terminal state -> Error
pub fn validate_transition(from: &PipelineState, to: &PipelineState) -> Result<(), PipelineError> {
    use PipelineState::*;

    let valid = match (from, to) {
        (Init, AwaitingScript) => true,
        (AwaitingScript, Running(_)) | (AwaitingScript, NotLaunched) => true,
        (Running(_), Running(_)) | (Running(_), Done) => true,
        (from, Error) => !from.is_terminal(),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(PipelineError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
