pub mod agents;
pub mod builtin;

use crate::model::ModelError;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use tracing::{debug, error, warn};

pub type ArgumentMap = BTreeMap<String, Value>;

/// Failure raised by an action callable. The registry absorbs these and
/// degrades the step to a null result; it never propagates them.
#[derive(Debug, thiserror::Error)]
pub enum ActionFailure {
    #[error("missing argument `{0}`")]
    MissingArgument(String),
    #[error("argument `{0}` has an unexpected type")]
    ArgumentType(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("{0}")]
    Other(String),
}

/// One declared argument of an action: name plus its type as shown to the
/// model in the action catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSignature {
    pub arg_name: String,
    pub arg_type: String,
}

impl ArgumentSignature {
    pub fn new(arg_name: impl Into<String>, arg_type: impl Into<String>) -> Self {
        Self {
            arg_name: arg_name.into(),
            arg_type: arg_type.into(),
        }
    }
}

impl std::fmt::Display for ArgumentSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.arg_name, self.arg_type)
    }
}

/// Immutable action descriptor. Signatures are static data supplied at
/// registration; nothing is reflected off the callable at runtime.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub variable: String,
    #[serde(default)]
    pub arguments_sig: Vec<ArgumentSignature>,
}

impl Action {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        variable: impl Into<String>,
        arguments_sig: Vec<ArgumentSignature>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            variable: variable.into(),
            arguments_sig,
        }
    }
}

// Identity is (name, description, variable); signatures are presentation
// detail and stay out of equality.
impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.variable == other.variable
    }
}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.description.hash(state);
        self.variable.hash(state);
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Name: {}", self.name)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Arguments:")?;
        for signature in &self.arguments_sig {
            writeln!(f, "{signature}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionArgument {
    pub name: String,
    pub value: Value,
}

/// The model's request to invoke one action. String values may carry
/// unresolved `{ref:...}` placeholders until the executor resolves them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionRequest {
    pub action_name: String,
    #[serde(default)]
    pub action_arguments: Vec<ActionArgument>,
}

impl ActionRequest {
    pub fn new(action_name: impl Into<String>, action_arguments: Vec<ActionArgument>) -> Self {
        Self {
            action_name: action_name.into(),
            action_arguments,
        }
    }

    pub fn argument_map(&self) -> ArgumentMap {
        self.action_arguments
            .iter()
            .map(|argument| (argument.name.clone(), argument.value.clone()))
            .collect()
    }
}

/// Result envelope of a dispatched action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOutput {
    pub source: String,
    pub variable: String,
    pub result: Value,
}

type ActionFn = Box<dyn Fn(&ArgumentMap) -> Result<Value, ActionFailure> + Send + Sync>;

/// Ordered table of registered actions. Registration appends without
/// deduplication; lookup is a linear scan taking the first name match, so
/// callers that need unique names must dedupe themselves.
#[derive(Default)]
pub struct ActionRegistry {
    entries: Vec<(Action, ActionFn)>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, action: Action, callable: F)
    where
        F: Fn(&ArgumentMap) -> Result<Value, ActionFailure> + Send + Sync + 'static,
    {
        debug!(action = %action.name, "registered action");
        self.entries.push((action, Box::new(callable)));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.entries.iter().map(|(action, _)| action)
    }

    /// Textual catalog of every registered action, substituted into the
    /// classifier prompt so the model can see what it may call.
    pub fn render_details(&self) -> String {
        let mut details = String::new();
        for action in self.actions() {
            details.push_str(&action.to_string());
        }
        details
    }

    /// Runs the first action matching the request's name. A callable
    /// failure and an unknown name both collapse to `None`; callers
    /// cannot and should not tell them apart.
    pub fn dispatch(&self, request: &ActionRequest) -> Option<ActionOutput> {
        debug!(action = %request.action_name, "action requested");
        let arguments = request.argument_map();

        for (action, callable) in &self.entries {
            if action.name != request.action_name {
                continue;
            }
            return match callable(&arguments) {
                Ok(result) => {
                    debug!(action = %action.name, "action executed");
                    Some(ActionOutput {
                        source: action.name.clone(),
                        variable: action.variable.clone(),
                        result,
                    })
                }
                Err(failure) => {
                    error!(
                        action = %action.name,
                        arguments = ?arguments,
                        error = %failure,
                        "action callable failed"
                    );
                    None
                }
            };
        }

        warn!(action = %request.action_name, "no action registered under that name");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_action() -> Action {
        Action::new(
            "echo",
            "Echoes `x` back.",
            "echoed",
            vec![ArgumentSignature::new("x", "str")],
        )
    }

    fn echo_request(value: &str) -> ActionRequest {
        ActionRequest::new(
            "echo",
            vec![ActionArgument {
                name: "x".to_string(),
                value: json!(value),
            }],
        )
    }

    fn registry_with_echo() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register(echo_action(), |arguments| {
            arguments
                .get("x")
                .cloned()
                .ok_or_else(|| ActionFailure::MissingArgument("x".to_string()))
        });
        registry
    }

    #[test]
    fn dispatch_fills_source_and_variable_from_the_descriptor() {
        let registry = registry_with_echo();
        let output = registry.dispatch(&echo_request("hello")).expect("output");
        assert_eq!(output.source, "echo");
        assert_eq!(output.variable, "echoed");
        assert_eq!(output.result, json!("hello"));
    }

    #[test]
    fn dispatch_of_unknown_action_returns_none() {
        let registry = registry_with_echo();
        let request = ActionRequest::new("missing", vec![]);
        assert!(registry.dispatch(&request).is_none());
    }

    #[test]
    fn callable_failure_degrades_to_none() {
        let mut registry = ActionRegistry::new();
        registry.register(echo_action(), |_| {
            Err(ActionFailure::Other("deliberate".to_string()))
        });
        assert!(registry.dispatch(&echo_request("hello")).is_none());
    }

    #[test]
    fn duplicate_registration_keeps_both_entries_and_first_match_wins() {
        let mut registry = registry_with_echo();
        registry.register(echo_action(), |_| Ok(json!("shadowed")));
        assert_eq!(registry.len(), 2);
        let output = registry.dispatch(&echo_request("hello")).expect("output");
        assert_eq!(output.result, json!("hello"));
    }

    #[test]
    fn action_identity_ignores_signatures() {
        let mut without_sig = echo_action();
        without_sig.arguments_sig.clear();
        assert_eq!(without_sig, echo_action());
    }

    #[test]
    fn render_details_lists_every_action() {
        let registry = registry_with_echo();
        let details = registry.render_details();
        assert!(details.contains("Name: echo"));
        assert!(details.contains("x: str"));
    }

    #[test]
    fn argument_map_preserves_values() {
        let request = echo_request("hello");
        let map = request.argument_map();
        assert_eq!(map.get("x"), Some(&json!("hello")));
    }
}
