pub mod executor;
pub mod planner;
pub mod resolver;

pub use executor::WorkflowExecutor;
pub use planner::{Analysis, Analyzer, Feedback, PlannedStep, WorkflowAgent, WorkflowPlanner};
pub use resolver::{ReferenceResolver, UnresolvedReference};

use crate::actions::{ActionOutput, ActionRequest};
use crate::model::ModelError;
use crate::reflector::Reflection;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("step `{step}` references `{name}` which no earlier step produced")]
    UnknownReference {
        step: String,
        name: String,
        /// Steps recorded before the failure, kept for inspection.
        partial: Box<ExecutedWorkflow>,
    },
    #[error("step `{step}` has no `ref_output_as` key to store its output under")]
    MissingOutputKey { step: String },
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Control metadata of one plan step. `depends_on` is advisory; the
/// executor follows declared plan order, and only `ref_output_as` has
/// operational meaning as the executed-context key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ControlData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub ref_output_as: Option<String>,
}

/// One unit of work inside a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlanStep {
    pub message: String,
    pub intent: String,
    pub action_request: ActionRequest,
    pub control: ControlData,
}

/// Ordered sequence of steps produced by the planner. Iteration order is
/// execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    pub plans: Vec<PlanStep>,
}

impl Plan {
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanStep> {
        self.plans.iter()
    }
}

/// Fully-populated record of one executed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutedStep {
    pub message: String,
    pub intent: String,
    pub action_request: ActionRequest,
    #[serde(default)]
    pub action_output: Option<ActionOutput>,
    pub control: ControlData,
    #[serde(default)]
    pub reflection: Option<Reflection>,
}

/// Keyed record of all steps run so far, keyed by each step's
/// `ref_output_as`. A duplicate key silently overwrites the earlier
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutedWorkflow {
    #[serde(default)]
    pub executed: BTreeMap<String, ExecutedStep>,
}

impl ExecutedWorkflow {
    pub fn insert(&mut self, key: impl Into<String>, step: ExecutedStep) {
        self.executed.insert(key.into(), step);
    }

    pub fn get(&self, key: &str) -> Option<&ExecutedStep> {
        self.executed.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.executed.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.executed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executed.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExecutedStep)> {
        self.executed.iter()
    }
}
