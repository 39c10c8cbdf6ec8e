use crate::actions::agents::{CodeAgent, ThinkAgent};
use crate::actions::builtin::register_builtin_actions;
use crate::actions::{Action, ActionOutput, ActionRegistry};
use crate::config::PrometheusConfig;
use crate::history::{ConversationHistory, HistoryError};
use crate::input::UserInput;
use crate::model::{tool_parameters, ChatMessage, ModelAgent, ModelChannel, ModelError};
use crate::prompts;
use crate::reflector::{Reflection, Reflector};
use crate::workflow::{
    Analyzer, ExecutedWorkflow, WorkflowAgent, WorkflowError, WorkflowExecutor, WorkflowPlanner,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    History(#[from] HistoryError),
}

/// The closed set of turn modes. Anything else the classifier emits is an
/// unrecognized mode: logged, and the turn yields no output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Respond,
    Act,
    Plan,
}

impl Mode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "respond" => Some(Self::Respond),
            "act" => Some(Self::Act),
            "plan" => Some(Self::Plan),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Respond => write!(f, "respond"),
            Mode::Act => write!(f, "act"),
            Mode::Plan => write!(f, "plan"),
        }
    }
}

/// Classification payload returned by the main agent. `mode` stays a
/// plain string on the wire so an out-of-set value surfaces as an
/// unrecognized mode instead of a schema failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrometheusResponse {
    /// One of: respond, act, plan.
    pub mode: String,
    #[serde(default)]
    pub text: Option<String>,
    /// Task description, set when mode is plan.
    #[serde(default)]
    pub task: Option<String>,
    /// Single action to run, set when mode is act.
    #[serde(default)]
    pub action_request: Option<crate::actions::ActionRequest>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOutput {
    #[serde(default)]
    pub content: Option<String>,
}

/// Everything one turn produced. Constructed once per turn and immutable
/// once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusOutput {
    pub mode: Mode,
    pub text: ModelOutput,
    #[serde(default)]
    pub action_output: Option<ActionOutput>,
    #[serde(default)]
    pub task: Option<String>,
    #[serde(default)]
    pub executed: Option<ExecutedWorkflow>,
    #[serde(default)]
    pub reflection: Option<Reflection>,
}

/// The main agent. Classifies each request into respond/act/plan, drives
/// the action registry or the workflow pipeline accordingly, reflects on
/// what happened, and records the turn.
///
/// Single-threaded by design: `execute` takes `&mut self`, one turn runs
/// start-to-finish before the next. Embedders serving concurrent callers
/// must add their own mutual exclusion around the whole instance.
pub struct Prometheus {
    agent: ModelAgent,
    registry: ActionRegistry,
    workflow: WorkflowAgent,
    reflector: Reflector,
    history: ConversationHistory<UserInput, PrometheusOutput>,
}

impl Prometheus {
    pub fn new(
        config: &PrometheusConfig,
        channel: Arc<dyn ModelChannel>,
    ) -> Result<Self, OrchestratorError> {
        let mut registry = ActionRegistry::new();
        let think_agent = ThinkAgent::new(
            config.profile("think", &config.think_agent, prompts::THINK_PROMPT),
            channel.clone(),
        )?;
        let code_agent = CodeAgent::new(
            config.profile("code", &config.code_agent, prompts::CODE_PROMPT),
            channel.clone(),
        )?;
        register_builtin_actions(&mut registry, think_agent, code_agent);

        let mut main_profile =
            config.profile("prometheus", &config.main_agent, prompts::MAIN_PROMPT);
        main_profile.system_prompt = prompts::render_prompt(
            &main_profile.system_prompt,
            &[(prompts::ACTION_DATA_VAR, &registry.render_details())],
        );
        let agent = ModelAgent::new(
            main_profile,
            tool_parameters::<PrometheusResponse>()?,
            channel.clone(),
        );

        let analyzer = Analyzer::new(
            config.profile("analyzer", &config.analyzer, prompts::ANALYZER_PROMPT),
            channel.clone(),
        )?;
        let planner = WorkflowPlanner::new(
            config.profile("planner", &config.planner, prompts::PLANNER_PROMPT),
            channel.clone(),
        )?;
        let step_reflector = Reflector::new(
            config.profile("reflector", &config.reflector, prompts::REFLECTOR_PROMPT),
            channel.clone(),
        )?;
        let workflow = WorkflowAgent::new(analyzer, planner, WorkflowExecutor::new(step_reflector));

        let reflector = Reflector::new(
            config.profile("reflector", &config.reflector, prompts::REFLECTOR_PROMPT),
            channel,
        )?;

        let history = match &config.history.save_file {
            Some(path) => ConversationHistory::with_save_file(config.history.max_turns, path)?,
            None => ConversationHistory::new(config.history.max_turns),
        };

        Ok(Self {
            agent,
            registry,
            workflow,
            reflector,
            history,
        })
    }

    /// Runs one full turn. Returns `None` for an unrecognized mode (the
    /// turn produced nothing and is not recorded); every other completed
    /// turn is appended to history exactly once, at the very end.
    pub fn execute(
        &mut self,
        input: UserInput,
    ) -> Result<Option<PrometheusOutput>, OrchestratorError> {
        let context = self.context_messages();
        let validated: PrometheusResponse = self
            .agent
            .interact(input.build_message_content(), &context)?;

        let Some(mode) = Mode::parse(&validated.mode) else {
            warn!(mode = %validated.mode, "classifier returned a mode outside the known set");
            return Ok(None);
        };
        debug!(%mode, "turn classified");

        let mut output = PrometheusOutput {
            mode,
            text: ModelOutput {
                content: validated.text.clone(),
            },
            action_output: None,
            task: None,
            executed: None,
            reflection: None,
        };

        match mode {
            Mode::Respond => {}
            Mode::Act => match validated.action_request {
                Some(request) => output.action_output = self.registry.dispatch(&request),
                None => warn!("act classification carried no action request"),
            },
            Mode::Plan => {
                let message = input.message.clone().unwrap_or_default();
                let task = match validated.task {
                    Some(task) => task,
                    None => {
                        warn!("plan classification carried no task; falling back to the message");
                        message.clone()
                    }
                };
                output.task = Some(task.clone());
                output.executed = Some(self.workflow.run(&message, &task, &self.registry)?);
            }
        }

        if matches!(mode, Mode::Act | Mode::Plan) {
            output.reflection = Some(self.reflector.reflect(&output)?);
        }

        self.history.append(input, output.clone())?;
        Ok(Some(output))
    }

    /// Registered action descriptors, for listing surfaces.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.registry.actions()
    }

    pub fn history(&self) -> &ConversationHistory<UserInput, PrometheusOutput> {
        &self.history
    }

    fn context_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() * 2);
        for (input, output) in self.history.iter() {
            messages.push(ChatMessage::user(
                input.message.clone().unwrap_or_default(),
            ));
            if let Ok(encoded) = serde_json::to_string(output) {
                messages.push(ChatMessage::assistant(encoded));
            }
        }
        messages
    }
}
