use super::{ExecutedWorkflow, Plan, WorkflowError, WorkflowExecutor};
use crate::actions::ActionRegistry;
use crate::model::{
    tool_parameters, AgentProfile, MessageContent, ModelAgent, ModelChannel, ModelError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Task information the analyzer extracts for the planner.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Feedback {
    /// User goals for the current task.
    #[serde(default)]
    pub goals: Vec<String>,
    /// Required resources and hard constraints.
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub questions_for_users: Vec<String>,
}

/// One pre-planned step sketch; a guide for the planner, not an
/// executable step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedStep {
    /// Unique numeric id (1, 2, 3...).
    pub id: String,
    pub description: String,
    /// Ids of steps that must be completed first.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Analyzer output: a task breakdown handed to the planner as JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Analysis {
    pub feedback: Feedback,
    #[serde(default)]
    pub steps: Vec<PlannedStep>,
    /// Natural-language notes; not used for logic.
    #[serde(default)]
    pub scratchpad: Option<String>,
}

/// Breaks a user task down into goals, requirements and step sketches.
pub struct Analyzer {
    agent: ModelAgent,
}

impl Analyzer {
    pub fn new(profile: AgentProfile, channel: Arc<dyn ModelChannel>) -> Result<Self, ModelError> {
        let parameters = tool_parameters::<Analysis>()?;
        Ok(Self {
            agent: ModelAgent::new(profile, parameters, channel),
        })
    }

    pub fn run(&self, task: &str) -> Result<Analysis, ModelError> {
        self.agent.interact(MessageContent::Text(task.to_string()), &[])
    }
}

/// Turns an analysis into an executable plan.
pub struct WorkflowPlanner {
    agent: ModelAgent,
}

impl WorkflowPlanner {
    pub fn new(profile: AgentProfile, channel: Arc<dyn ModelChannel>) -> Result<Self, ModelError> {
        let parameters = tool_parameters::<Plan>()?;
        Ok(Self {
            agent: ModelAgent::new(profile, parameters, channel),
        })
    }

    pub fn run(&self, analysis: &Analysis) -> Result<Plan, ModelError> {
        let payload = serde_json::to_string(analysis).map_err(ModelError::Encode)?;
        self.agent.interact(MessageContent::Text(payload), &[])
    }
}

/// The whole planning path: analyze the task, plan it, execute the plan.
pub struct WorkflowAgent {
    analyzer: Analyzer,
    planner: WorkflowPlanner,
    executor: WorkflowExecutor,
}

impl WorkflowAgent {
    pub fn new(analyzer: Analyzer, planner: WorkflowPlanner, executor: WorkflowExecutor) -> Self {
        Self {
            analyzer,
            planner,
            executor,
        }
    }

    pub fn run(
        &self,
        message: &str,
        task: &str,
        registry: &ActionRegistry,
    ) -> Result<ExecutedWorkflow, WorkflowError> {
        let analysis = self
            .analyzer
            .run(&format!("message=`{message}`, task=`{task}`"))?;
        let plan = self.planner.run(&analysis)?;
        debug!(steps = plan.len(), "plan ready for execution");
        self.executor.execute_plan(&plan, registry)
    }
}
