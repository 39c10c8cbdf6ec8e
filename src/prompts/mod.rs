//! Default agent prompts, embedded so a bare config file yields a working
//! orchestrator. Any of them can be overridden per agent in the config.

pub const ACTION_DATA_VAR: &str = "{action_data}";

pub const MAIN_PROMPT: &str = include_str!("assets/main.prompt.md");
pub const ANALYZER_PROMPT: &str = include_str!("assets/analyzer.prompt.md");
pub const PLANNER_PROMPT: &str = include_str!("assets/planner.prompt.md");
pub const REFLECTOR_PROMPT: &str = include_str!("assets/reflector.prompt.md");
pub const THINK_PROMPT: &str = include_str!("assets/think.prompt.md");
pub const CODE_PROMPT: &str = include_str!("assets/code.prompt.md");

/// Substitutes `{variable}` markers in a prompt template.
pub fn render_prompt(template: &str, variables: &[(&str, &str)]) -> String {
    let mut rendered = template.to_string();
    for (variable, value) in variables {
        rendered = rendered.replace(variable, value);
    }
    rendered
}
