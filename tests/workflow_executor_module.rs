use prometheus_agent::actions::{
    Action, ActionArgument, ActionFailure, ActionRegistry, ActionRequest, ArgumentSignature,
};
use prometheus_agent::model::{
    AgentProfile, ChatRequest, ChatResponse, Choice, ChoiceMessage, ModelChannel, ModelError,
    ToolCall, ToolCallFunction,
};
use prometheus_agent::reflector::Reflector;
use prometheus_agent::workflow::{ControlData, Plan, PlanStep, WorkflowError, WorkflowExecutor};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

fn tool_call_response(arguments: &str) -> ChatResponse {
    ChatResponse {
        choices: Some(vec![Choice {
            message: ChoiceMessage {
                tool_calls: vec![ToolCall {
                    function: ToolCallFunction {
                        name: "respond".to_string(),
                        arguments: arguments.to_string(),
                    },
                }],
            },
        }]),
        error: None,
    }
}

struct ScriptedChannel {
    responses: Mutex<VecDeque<ChatResponse>>,
}

impl ModelChannel for ScriptedChannel {
    fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| ModelError::Transport("scripted channel exhausted".to_string()))
    }
}

fn reflector_replying(times: usize) -> Reflector {
    let responses = (0..times)
        .map(|_| tool_call_response(r#"{"summary":"fine","control":{"error_detected":false}}"#))
        .collect();
    Reflector::new(
        AgentProfile {
            name: "reflector".to_string(),
            model: "test-model".to_string(),
            system_prompt: "reflect".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        },
        Arc::new(ScriptedChannel {
            responses: Mutex::new(responses),
        }),
    )
    .expect("reflector")
}

fn echo_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register(
        Action::new(
            "echo",
            "Echoes `x` back.",
            "echoed",
            vec![ArgumentSignature::new("x", "str")],
        ),
        |arguments| {
            arguments
                .get("x")
                .cloned()
                .ok_or_else(|| ActionFailure::MissingArgument("x".to_string()))
        },
    );
    registry
}

fn echo_step(id: &str, value: &str, ref_output_as: &str) -> PlanStep {
    PlanStep {
        message: format!("echo {value}"),
        intent: "echo".to_string(),
        action_request: ActionRequest::new(
            "echo",
            vec![ActionArgument {
                name: "x".to_string(),
                value: json!(value),
            }],
        ),
        control: ControlData {
            id: Some(id.to_string()),
            depends_on: vec![],
            ref_output_as: Some(ref_output_as.to_string()),
        },
    }
}

#[test]
fn forward_reference_plan_produces_one_entry_per_step() {
    let plan = Plan {
        plans: vec![
            echo_step("1", "hello", "s1"),
            echo_step("2", "{ref:s1} world", "s2"),
            echo_step("3", "{ref:s2}!", "s3"),
        ],
    };
    let executor = WorkflowExecutor::new(reflector_replying(3));
    let executed = executor
        .execute_plan(&plan, &echo_registry())
        .expect("executed");

    assert_eq!(executed.len(), plan.len());
    assert_eq!(
        executed.get("s1").expect("s1").action_output.as_ref().expect("out").result,
        json!("hello")
    );
    assert_eq!(
        executed.get("s2").expect("s2").action_output.as_ref().expect("out").result,
        json!("hello world")
    );
    assert_eq!(
        executed.get("s3").expect("s3").action_output.as_ref().expect("out").result,
        json!("hello world!")
    );
}

#[test]
fn backward_reference_fails_even_when_depends_on_claims_otherwise() {
    // depends_on is advisory; declared order is the real contract
    let mut early = echo_step("1", "{ref:late}", "early");
    early.control.depends_on = vec!["2".to_string()];
    let plan = Plan {
        plans: vec![early, echo_step("2", "value", "late")],
    };
    let executor = WorkflowExecutor::new(reflector_replying(2));
    let err = executor
        .execute_plan(&plan, &echo_registry())
        .expect_err("must fail");

    match err {
        WorkflowError::UnknownReference { name, partial, .. } => {
            assert_eq!(name, "late");
            assert!(partial.is_empty());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn reflection_failure_is_fatal_to_the_plan() {
    let plan = Plan {
        plans: vec![echo_step("1", "hello", "s1")],
    };
    // zero scripted responses: the per-step reflection call fails
    let executor = WorkflowExecutor::new(reflector_replying(0));
    let err = executor
        .execute_plan(&plan, &echo_registry())
        .expect_err("must fail");
    assert!(matches!(err, WorkflowError::Model(_)));
}
