use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::payload::Payload;

/// An event emitted by an event source.
///
/// Immutable once created. Every pipeline triggered by the event sees the
/// same `data` for all of its script evaluations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    #[serde(default)]
    pub data: Payload,
}

impl Event {
    pub fn new(name: impl Into<String>, data: Payload) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// One step of a reaction: the action to run and the script that decides
/// what happens with its output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    #[serde(default)]
    pub name: String,
    pub module: String,
    pub action: String,
    /// Follow-up decision script. Empty ends the pipeline after this step.
    #[serde(default)]
    pub script: String,
}

/// Binding of an event name to a scripted chain of action steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub name: String,
    #[serde(default)]
    pub event: String,
    /// Entry script; picks the first step (or none).
    #[serde(default)]
    pub script: String,
    #[serde(default, alias = "actions")]
    pub steps: BTreeMap<String, ActionStep>,
}

impl Reaction {
    pub fn new(
        name: impl Into<String>,
        event: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            event: event.into(),
            script: script.into(),
            steps: BTreeMap::new(),
        }
    }

    /// Add a step keyed by its name, returning the reaction for chaining.
    pub fn with_step(mut self, mut step: ActionStep) -> Self {
        step.name = if step.name.is_empty() {
            format!("step{}", self.steps.len())
        } else {
            step.name
        };
        self.steps.insert(step.name.clone(), step);
        self
    }

    pub fn step(&self, name: &str) -> Option<&ActionStep> {
        self.steps.get(name)
    }

    /// Fill in step names from their map keys. Reactions decoded from JSON
    /// may omit the redundant `name` field inside each step.
    pub fn normalize(mut self) -> Self {
        for (key, step) in self.steps.iter_mut() {
            if step.name.is_empty() {
                step.name = key.clone();
            }
        }
        self
    }
}

impl ActionStep {
    pub fn new(
        name: impl Into<String>,
        module: impl Into<String>,
        action: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            action: action.into(),
            script: script.into(),
        }
    }
}

/// Human-facing description of one action or event parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentDescriptor {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
}

impl ArgumentDescriptor {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

/// One action (or event) a module declares, with its documented arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(rename = "data_in")]
    pub input: Vec<ArgumentDescriptor>,
    #[serde(rename = "data_out")]
    pub output: Vec<ArgumentDescriptor>,
}

impl Capability {
    pub fn new(
        name: impl Into<String>,
        input: Vec<ArgumentDescriptor>,
        output: Vec<ArgumentDescriptor>,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output,
        }
    }
}

/// Terminal state of one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// The chain ran and stopped normally.
    Done,
    /// The entry script chose not to start the chain.
    NotLaunched,
    /// A script or action failed.
    Error,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PipelineStatus::Done => "done",
            PipelineStatus::NotLaunched => "not launched",
            PipelineStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}
