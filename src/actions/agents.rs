use crate::model::{
    tool_parameters, AgentProfile, MessageContent, ModelAgent, ModelChannel, ModelError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Shared response shape of the model-backed action agents. `text` is the
/// agent's commentary, `response` the payload handed back as the action
/// result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionAgentResponse {
    pub text: String,
    pub response: String,
}

/// Action agent specialized in reasoning. A recursive single-turn model
/// interaction wired up as an ordinary registered action.
pub struct ThinkAgent {
    agent: ModelAgent,
}

impl ThinkAgent {
    pub fn new(profile: AgentProfile, channel: Arc<dyn ModelChannel>) -> Result<Self, ModelError> {
        let parameters = tool_parameters::<ActionAgentResponse>()?;
        Ok(Self {
            agent: ModelAgent::new(profile, parameters, channel),
        })
    }

    pub fn run(&self, task: &str) -> Result<String, ModelError> {
        debug!(task, "calling the think action agent");
        let validated: ActionAgentResponse = self
            .agent
            .interact(MessageContent::Text(task.to_string()), &[])?;
        Ok(validated.response)
    }
}

/// Action agent specialized in writing code; same shape as [`ThinkAgent`]
/// with a different prompt.
pub struct CodeAgent {
    agent: ModelAgent,
}

impl CodeAgent {
    pub fn new(profile: AgentProfile, channel: Arc<dyn ModelChannel>) -> Result<Self, ModelError> {
        let parameters = tool_parameters::<ActionAgentResponse>()?;
        Ok(Self {
            agent: ModelAgent::new(profile, parameters, channel),
        })
    }

    pub fn run(&self, task: &str) -> Result<String, ModelError> {
        debug!(task, "calling the code action agent");
        let validated: ActionAgentResponse = self
            .agent
            .interact(MessageContent::Text(task.to_string()), &[])?;
        Ok(validated.response)
    }
}
