use super::{ExecutedStep, ExecutedWorkflow, Plan, PlanStep, ReferenceResolver, WorkflowError};
use crate::actions::ActionRegistry;
use crate::reflector::Reflector;
use serde_json::Value;
use tracing::debug;

/// Runs a validated plan step by step in declared order. Declared order is
/// the real dependency contract: a step can only reference outputs of
/// steps that appear strictly earlier, whatever `depends_on` claims.
pub struct WorkflowExecutor {
    resolver: ReferenceResolver,
    reflector: Reflector,
}

impl WorkflowExecutor {
    pub fn new(reflector: Reflector) -> Self {
        Self {
            resolver: ReferenceResolver::new(),
            reflector,
        }
    }

    /// Reference-resolution failures abort the plan immediately, carrying
    /// the partial context in the error. A failed dispatch degrades the
    /// one step to a null output and execution continues. Each executed
    /// step is reflected on before it is recorded.
    pub fn execute_plan(
        &self,
        plan: &Plan,
        registry: &ActionRegistry,
    ) -> Result<ExecutedWorkflow, WorkflowError> {
        let mut context = ExecutedWorkflow::default();

        for (index, step) in plan.iter().enumerate() {
            let label = step_label(step, index);
            debug!(step = %label, intent = %step.intent, "executing plan step");

            let mut request = step.action_request.clone();
            for argument in &mut request.action_arguments {
                let Some(text) = argument.value.as_str() else {
                    continue;
                };
                if !self.resolver.contains_reference(text) {
                    continue;
                }
                match self.resolver.resolve(text, &context) {
                    Ok(resolved) => argument.value = Value::String(resolved),
                    Err(err) => {
                        return Err(WorkflowError::UnknownReference {
                            step: label,
                            name: err.name,
                            partial: Box::new(context),
                        })
                    }
                }
            }

            let action_output = registry.dispatch(&request);
            if action_output.is_some() {
                debug!(step = %label, "action produced a result");
            }

            let mut executed = ExecutedStep {
                message: step.message.clone(),
                intent: step.intent.clone(),
                action_request: request,
                action_output,
                control: step.control.clone(),
                reflection: None,
            };
            executed.reflection = Some(self.reflector.reflect(&executed)?);

            let Some(key) = executed.control.ref_output_as.clone() else {
                return Err(WorkflowError::MissingOutputKey { step: label });
            };
            context.insert(key, executed);
        }

        Ok(context)
    }
}

fn step_label(step: &PlanStep, index: usize) -> String {
    step.control
        .id
        .clone()
        .unwrap_or_else(|| format!("#{index}"))
}
