use super::agents::{CodeAgent, ThinkAgent};
use super::{Action, ActionFailure, ActionRegistry, ArgumentMap, ArgumentSignature};
use serde_json::{json, Value};
use std::fs;
use std::io::ErrorKind;
use std::process::Command;

/// Registers the stock action set. The think/code agents are constructed
/// by the caller and moved into their closures here; nothing is held in
/// process-global state.
pub fn register_builtin_actions(
    registry: &mut ActionRegistry,
    think_agent: ThinkAgent,
    code_agent: CodeAgent,
) {
    registry.register(
        Action::new(
            "Think",
            "Uses an agent designated for thinking to reason about tasks.",
            "chain_of_thought",
            vec![ArgumentSignature::new("task", "str")],
        ),
        move |arguments| {
            let task = string_argument(arguments, "task")?;
            Ok(json!(think_agent.run(&task)?))
        },
    );

    registry.register(
        Action::new(
            "Code",
            "Uses an agent designated for coding out specific programs",
            "code_output",
            vec![ArgumentSignature::new("task", "str")],
        ),
        move |arguments| {
            let task = string_argument(arguments, "task")?;
            Ok(json!(code_agent.run(&task)?))
        },
    );

    registry.register(
        Action::new(
            "FileWrite",
            "Writes `content` to a `file`",
            "success",
            vec![
                ArgumentSignature::new("file", "str"),
                ArgumentSignature::new("content", "str"),
            ],
        ),
        |arguments| {
            let file = string_argument(arguments, "file")?;
            let content = string_argument(arguments, "content")?;
            Ok(Value::Bool(fs::write(file, content).is_ok()))
        },
    );

    registry.register(
        Action::new(
            "FileRead",
            "Reads contents of `file`",
            "contents",
            vec![ArgumentSignature::new("file", "str")],
        ),
        |arguments| {
            let file = string_argument(arguments, "file")?;
            match fs::read_to_string(&file) {
                Ok(contents) => Ok(json!(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(json!("FileNotFound!")),
                Err(err) => Err(ActionFailure::Other(format!(
                    "failed to read {file}: {err}"
                ))),
            }
        },
    );

    registry.register(
        Action::new(
            "Execute",
            "Executes system commands",
            "output",
            vec![ArgumentSignature::new("cmd", "str")],
        ),
        |arguments| {
            let cmd = string_argument(arguments, "cmd")?;
            Ok(json!(run_shell_command(&cmd)))
        },
    );
}

fn run_shell_command(cmd: &str) -> String {
    let output = Command::new("sh").arg("-c").arg(cmd).output();
    match output {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).into_owned()
            } else {
                stdout.into_owned()
            }
        }
        Err(_) => format!("Error while doing {cmd}"),
    }
}

fn string_argument(arguments: &ArgumentMap, name: &str) -> Result<String, ActionFailure> {
    let value = arguments
        .get(name)
        .ok_or_else(|| ActionFailure::MissingArgument(name.to_string()))?;
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ActionFailure::ArgumentType(name.to_string()))
}
