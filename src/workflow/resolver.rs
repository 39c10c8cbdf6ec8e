use super::ExecutedWorkflow;
use crate::actions::ActionOutput;
use regex::Regex;
use serde_json::Value;

const REF_PATTERN: &str = r"\{ref:([A-Za-z0-9_]+)\}";

/// A reference to a step output that no earlier step produced. Fatal to
/// the plan; the resolver never substitutes a placeholder for a missing
/// key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no executed step is stored under reference `{name}`")]
pub struct UnresolvedReference {
    pub name: String,
}

/// Rewrites `{ref:name}` placeholders into the string form of the named
/// step's action result.
pub struct ReferenceResolver {
    pattern: Regex,
}

impl Default for ReferenceResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(REF_PATTERN).expect("reference pattern is a valid regex"),
        }
    }

    /// Cheap pre-check so arguments without placeholders skip the
    /// substitution pass entirely.
    pub fn contains_reference(&self, value: &str) -> bool {
        self.pattern.is_match(value)
    }

    pub fn resolve(
        &self,
        value: &str,
        context: &ExecutedWorkflow,
    ) -> Result<String, UnresolvedReference> {
        let mut missing: Option<String> = None;
        let resolved = self.pattern.replace_all(value, |captures: &regex::Captures| {
            let name = &captures[1];
            match context.get(name) {
                Some(step) => render_result(step.action_output.as_ref()),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        match missing {
            Some(name) => Err(UnresolvedReference { name }),
            None => Ok(resolved.into_owned()),
        }
    }
}

// String payloads are inserted verbatim; anything else uses its compact
// JSON rendering, so a failed step's absent output reads as `null`.
fn render_result(output: Option<&ActionOutput>) -> String {
    match output {
        Some(output) => match &output.result {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        },
        None => Value::Null.to_string(),
    }
}
