pub mod agent;

pub use agent::{tool_parameters, AgentProfile, ModelAgent, RESPOND_TOOL_NAME};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model transport failure: {0}")]
    Transport(String),
    #[error("model api error: {message} (code {code:?})")]
    Api { message: String, code: Option<i64> },
    #[error("model response carried no tool call")]
    MissingToolCall,
    #[error("tool call arguments did not match the expected shape: {0}")]
    Schema(#[source] serde_json::Error),
    #[error("failed to encode model payload: {0}")]
    Encode(#[source] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: MessageContent,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(content.into()),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(content.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolFunction,
}

impl ToolSchema {
    pub fn function(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolFunction {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoiceFunction {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolChoice {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ToolChoiceFunction,
}

impl ToolChoice {
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            kind: "function".to_string(),
            function: ToolChoiceFunction { name: name.into() },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSchema>,
    pub tool_choice: ToolChoice,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Option<Vec<Choice>>,
    #[serde(default)]
    pub error: Option<ApiErrorBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub function: ToolCallFunction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<i64>,
}

/// Pulls the JSON arguments of the first tool call out of a response.
/// The contract requires exactly one tool call per successful response;
/// extra calls are ignored, a missing one is a contract violation.
pub fn extract_tool_arguments(response: &ChatResponse) -> Result<&str, ModelError> {
    if let Some(body) = &response.error {
        error!(message = %body.message, code = ?body.code, "model api returned an error payload");
        return Err(ModelError::Api {
            message: body.message.clone(),
            code: body.code,
        });
    }

    response
        .choices
        .as_deref()
        .and_then(<[Choice]>::first)
        .and_then(|choice| choice.message.tool_calls.first())
        .map(|call| call.function.arguments.as_str())
        .filter(|arguments| !arguments.is_empty())
        .ok_or(ModelError::MissingToolCall)
}

pub trait ModelChannel: Send + Sync {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError>;
}

/// Blocking HTTP implementation of the model channel. Error-status bodies
/// are parsed as api error payloads rather than treated as transport
/// failures, since providers ship structured errors on 4xx/5xx.
pub struct HttpModelChannel {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl HttpModelChannel {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Option<Duration>) -> Self {
        let mut builder = ureq::AgentBuilder::new();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

impl ModelChannel for HttpModelChannel {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        let body = serde_json::to_value(request).map_err(ModelError::Encode)?;
        let result = self
            .agent
            .post(&self.base_url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(body);

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(err) => return Err(ModelError::Transport(err.to_string())),
        };

        response
            .into_json::<ChatResponse>()
            .map_err(|err| ModelError::Transport(err.to_string()))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) fn tool_call_response(arguments: &str) -> ChatResponse {
        ChatResponse {
            choices: Some(vec![Choice {
                message: ChoiceMessage {
                    tool_calls: vec![ToolCall {
                        function: ToolCallFunction {
                            name: RESPOND_TOOL_NAME.to_string(),
                            arguments: arguments.to_string(),
                        },
                    }],
                },
            }]),
            error: None,
        }
    }

    /// Channel fake that replays a fixed queue of responses in order.
    pub(crate) struct ScriptedChannel {
        responses: Mutex<VecDeque<ChatResponse>>,
    }

    impl ScriptedChannel {
        pub(crate) fn new(responses: Vec<ChatResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }

        pub(crate) fn replying_with(arguments: &str) -> Self {
            Self::new(vec![tool_call_response(arguments)])
        }
    }

    impl ModelChannel for ScriptedChannel {
        fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ModelError> {
            let mut responses = self.responses.lock().expect("scripted channel lock");
            responses
                .pop_front()
                .ok_or_else(|| ModelError::Transport("scripted channel exhausted".to_string()))
        }
    }
}
