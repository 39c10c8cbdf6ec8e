use crate::model::{
    tool_parameters, AgentProfile, MessageContent, ModelAgent, ModelChannel, ModelError,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Advisory recovery recommendation. Recorded with the reflection, never
/// acted on automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Retry,
    ModifyInput,
    Escalate,
    Abort,
    Skip,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorControl {
    #[serde(default)]
    pub error_detected: Option<bool>,
    #[serde(default)]
    pub error_reason: Option<String>,
    #[serde(default)]
    pub recommended_action: Option<RecommendedAction>,
}

/// Structured post-mortem of an executed step or whole turn: a summary
/// plus an optional error-control block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Reflection {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub control: Option<ErrorControl>,
}

/// Model-backed reflector. Reflection is mandatory feedback: a transport
/// or schema failure here is a hard failure, never a degraded Reflection.
pub struct Reflector {
    agent: ModelAgent,
}

impl Reflector {
    pub fn new(profile: AgentProfile, channel: Arc<dyn ModelChannel>) -> Result<Self, ModelError> {
        let parameters = tool_parameters::<Reflection>()?;
        Ok(Self {
            agent: ModelAgent::new(profile, parameters, channel),
        })
    }

    pub fn reflect<T: Serialize>(&self, subject: &T) -> Result<Reflection, ModelError> {
        let payload = serde_json::to_string(subject).map_err(ModelError::Encode)?;
        let reflection: Reflection = self.agent.interact(MessageContent::Text(payload), &[])?;
        debug!(
            error_detected = ?reflection.control.as_ref().and_then(|control| control.error_detected),
            "reflection produced"
        );
        Ok(reflection)
    }
}
