use prometheus_agent::config::PrometheusConfig;
use prometheus_agent::input::UserInput;
use prometheus_agent::model::{
    ChatRequest, ChatResponse, Choice, ChoiceMessage, ModelChannel, ModelError, ToolCall,
    ToolCallFunction,
};
use prometheus_agent::orchestrator::{Mode, Prometheus};
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
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedChannel {
    fn new(scripted: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(scripted.iter().map(|s| tool_call_response(s)).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn request_message_counts(&self) -> Vec<usize> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|request| request.messages.len())
            .collect()
    }
}

impl ModelChannel for ScriptedChannel {
    fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        self.responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| ModelError::Transport("scripted channel exhausted".to_string()))
    }
}

fn sample_config() -> PrometheusConfig {
    serde_yaml::from_str(
        r#"
model:
  name: test-model
  base_url: https://model.invalid/v1/chat/completions
history:
  max_turns: 4
"#,
    )
    .expect("config")
}

fn agent_with(channel: Arc<ScriptedChannel>) -> Prometheus {
    Prometheus::new(&sample_config(), channel).expect("orchestrator")
}

#[test]
fn respond_turn_carries_only_text_and_records_one_pair() {
    let channel = ScriptedChannel::new(&[r#"{"mode":"respond","text":"hello there"}"#]);
    let mut agent = agent_with(channel.clone());

    let output = agent
        .execute(UserInput::message("hi"))
        .expect("turn")
        .expect("output");

    assert_eq!(output.mode, Mode::Respond);
    assert_eq!(output.text.content.as_deref(), Some("hello there"));
    assert!(output.action_output.is_none());
    assert!(output.task.is_none());
    assert!(output.executed.is_none());
    assert!(output.reflection.is_none());
    assert_eq!(agent.history().len(), 1);
    assert_eq!(channel.request_count(), 1);
}

#[test]
fn unrecognized_mode_yields_no_output_and_no_history() {
    let channel = ScriptedChannel::new(&[r#"{"mode":"banana","text":"??"}"#]);
    let mut agent = agent_with(channel);

    let output = agent.execute(UserInput::message("hi")).expect("turn");
    assert!(output.is_none());
    assert_eq!(agent.history().len(), 0);
}

#[test]
fn act_turn_dispatches_the_embedded_action_and_reflects() {
    let classify = r#"{
        "mode":"act",
        "text":"thinking about it",
        "action_request":{"action_name":"Think","action_arguments":[{"name":"task","value":"weigh the options"}]}
    }"#;
    let think = r#"{"text":"let me see","response":"option b"}"#;
    let reflection = r#"{"summary":"thought it through","control":{"error_detected":false}}"#;
    let channel = ScriptedChannel::new(&[classify, think, reflection]);
    let mut agent = agent_with(channel.clone());

    let output = agent
        .execute(UserInput::message("which option?"))
        .expect("turn")
        .expect("output");

    assert_eq!(output.mode, Mode::Act);
    let action_output = output.action_output.expect("action output");
    assert_eq!(action_output.source, "Think");
    assert_eq!(action_output.variable, "chain_of_thought");
    assert_eq!(action_output.result, json!("option b"));
    let reflection = output.reflection.expect("reflection");
    assert_eq!(reflection.summary.as_deref(), Some("thought it through"));
    assert_eq!(agent.history().len(), 1);
    assert_eq!(channel.request_count(), 3);
}

#[test]
fn act_turn_with_unknown_action_degrades_to_a_null_output() {
    let classify = r#"{
        "mode":"act",
        "text":"trying",
        "action_request":{"action_name":"Nonexistent","action_arguments":[]}
    }"#;
    let reflection = r#"{"summary":"nothing ran","control":{"error_detected":true,"error_reason":"unknown action","recommended_action":"modify_input"}}"#;
    let channel = ScriptedChannel::new(&[classify, reflection]);
    let mut agent = agent_with(channel);

    let output = agent
        .execute(UserInput::message("do the thing"))
        .expect("turn")
        .expect("output");

    assert!(output.action_output.is_none());
    assert!(output.reflection.is_some());
    assert_eq!(agent.history().len(), 1);
}

#[test]
fn plan_turn_runs_the_full_pipeline_with_references() {
    let classify = r#"{"mode":"plan","text":"planning","task":"think twice"}"#;
    let analysis = r#"{"feedback":{"goals":["think twice"]},"steps":[
        {"id":"1","description":"first thought"},
        {"id":"2","description":"second thought","depends_on":["1"]}
    ]}"#;
    let plan = r#"{"plans":[
        {
            "message":"first thought",
            "intent":"think",
            "action_request":{"action_name":"Think","action_arguments":[{"name":"task","value":"seed idea"}]},
            "control":{"id":"1","depends_on":[],"ref_output_as":"s1"}
        },
        {
            "message":"second thought",
            "intent":"think",
            "action_request":{"action_name":"Think","action_arguments":[{"name":"task","value":"build on: {ref:s1}"}]},
            "control":{"id":"2","depends_on":["1"],"ref_output_as":"s2"}
        }
    ]}"#;
    let think_one = r#"{"text":"...","response":"a kernel"}"#;
    let step_reflection = r#"{"summary":"step done","control":{"error_detected":false}}"#;
    let think_two = r#"{"text":"...","response":"a grown idea"}"#;
    let turn_reflection = r#"{"summary":"planned and executed","control":{"error_detected":false}}"#;

    let channel = ScriptedChannel::new(&[
        classify,
        analysis,
        plan,
        think_one,
        step_reflection,
        think_two,
        step_reflection,
        turn_reflection,
    ]);
    let mut agent = agent_with(channel.clone());

    let output = agent
        .execute(UserInput::message("please think twice"))
        .expect("turn")
        .expect("output");

    assert_eq!(output.mode, Mode::Plan);
    assert_eq!(output.task.as_deref(), Some("think twice"));
    let executed = output.executed.expect("executed workflow");
    assert_eq!(executed.len(), 2);

    let first = executed.get("s1").expect("s1");
    assert_eq!(
        first.action_output.as_ref().expect("output").result,
        json!("a kernel")
    );

    let second = executed.get("s2").expect("s2");
    assert_eq!(
        second.action_request.action_arguments[0].value,
        json!("build on: a kernel")
    );
    assert_eq!(
        second.action_output.as_ref().expect("output").result,
        json!("a grown idea")
    );
    assert!(second.reflection.is_some());

    assert!(output.reflection.is_some());
    assert_eq!(agent.history().len(), 1);
    assert_eq!(channel.request_count(), 8);
}

#[test]
fn history_context_grows_with_each_completed_turn() {
    let channel = ScriptedChannel::new(&[
        r#"{"mode":"respond","text":"first"}"#,
        r#"{"mode":"respond","text":"second"}"#,
    ]);
    let mut agent = agent_with(channel.clone());

    agent.execute(UserInput::message("one")).expect("turn one");
    agent.execute(UserInput::message("two")).expect("turn two");

    // system + user on the first call; plus one recorded pair on the second
    let counts = channel.request_message_counts();
    assert_eq!(counts, vec![2, 4]);
}

#[test]
fn model_transport_failure_is_fatal_and_unrecorded() {
    let channel = ScriptedChannel::new(&[]);
    let mut agent = agent_with(channel);

    let err = agent
        .execute(UserInput::message("hi"))
        .expect_err("must fail");
    assert!(err.to_string().contains("transport"));
    assert_eq!(agent.history().len(), 0);
}

#[test]
fn actions_listing_exposes_the_builtin_set() {
    let channel = ScriptedChannel::new(&[]);
    let agent = agent_with(channel);
    let names: Vec<&str> = agent.actions().map(|action| action.name.as_str()).collect();
    assert_eq!(names, vec!["Think", "Code", "FileWrite", "FileRead", "Execute"]);
}
