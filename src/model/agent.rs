use super::{
    extract_tool_arguments, ChatMessage, ChatRequest, MessageContent, ModelChannel, ModelError,
    Role, ToolChoice, ToolSchema,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Name of the forced function every agent response arrives through.
pub const RESPOND_TOOL_NAME: &str = "respond";

/// Everything an agent needs to address the model: identity for logging,
/// the target model, the system prompt, and sampling settings.
#[derive(Debug, Clone)]
pub struct AgentProfile {
    pub name: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Builds the parameter schema for the respond tool from a response type.
pub fn tool_parameters<T: schemars::JsonSchema>() -> Result<Value, ModelError> {
    let schema = schemars::schema_for!(T);
    serde_json::to_value(schema).map_err(ModelError::Encode)
}

/// Shared interaction core of every model-backed agent: assemble the
/// message list, call the channel, extract and validate the single tool
/// call the contract demands.
pub struct ModelAgent {
    profile: AgentProfile,
    tool: ToolSchema,
    channel: Arc<dyn ModelChannel>,
}

impl ModelAgent {
    pub fn new(profile: AgentProfile, parameters: Value, channel: Arc<dyn ModelChannel>) -> Self {
        let description = format!(
            "Respond using the {} response format. Arguments must be valid JSON. \
             Do not use XML, angle brackets or <parameter> tags.",
            profile.name
        );
        let tool = ToolSchema::function(RESPOND_TOOL_NAME, description, parameters);
        Self {
            profile,
            tool,
            channel,
        }
    }

    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn interact<T: DeserializeOwned>(
        &self,
        message: MessageContent,
        context: &[ChatMessage],
    ) -> Result<T, ModelError> {
        let mut messages = Vec::with_capacity(context.len() + 2);
        messages.push(ChatMessage::system(self.profile.system_prompt.clone()));
        messages.extend_from_slice(context);
        messages.push(ChatMessage {
            role: Role::User,
            content: message,
        });

        let request = ChatRequest {
            model: self.profile.model.clone(),
            messages,
            tools: vec![self.tool.clone()],
            tool_choice: ToolChoice::function(RESPOND_TOOL_NAME),
            temperature: self.profile.temperature,
            max_tokens: self.profile.max_tokens,
        };

        let response = self.channel.chat(&request)?;
        let arguments = extract_tool_arguments(&response)?;
        let validated = serde_json::from_str(arguments).map_err(ModelError::Schema)?;
        debug!(agent = %self.profile.name, "validated tool call payload");
        Ok(validated)
    }
}
