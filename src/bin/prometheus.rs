use prometheus_agent::config::load_config;
use prometheus_agent::input::UserInput;
use prometheus_agent::logging::init_logging;
use prometheus_agent::model::HttpModelChannel;
use prometheus_agent::orchestrator::Prometheus;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";

fn print_header() {
    println!("### PROMETHEUS CLI ###");
}

fn config_path_from_args(args: &[String]) -> Result<PathBuf, String> {
    match args {
        [] => Ok(PathBuf::from(DEFAULT_CONFIG_PATH)),
        [path] => Ok(PathBuf::from(path)),
        _ => Err("usage: prometheus [config-path]".to_string()),
    }
}

fn run() -> Result<(), String> {
    init_logging();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = config_path_from_args(&args)?;

    let config = load_config(&config_path).map_err(|err| err.to_string())?;
    let channel = Arc::new(HttpModelChannel::new(
        config.model.base_url.clone(),
        config.model.api_key.clone(),
        config.model.request_timeout(),
    ));
    let mut agent = Prometheus::new(&config, channel).map_err(|err| err.to_string())?;

    print_header();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush().map_err(|err| err.to_string())?;

        let mut line = String::new();
        let read = stdin
            .lock()
            .read_line(&mut line)
            .map_err(|err| err.to_string())?;
        if read == 0 {
            break;
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message.to_ascii_lowercase().as_str(), "quit" | "exit") {
            break;
        }

        let output = agent
            .execute(UserInput::message(message))
            .map_err(|err| err.to_string())?;
        match output {
            Some(output) => {
                let rendered =
                    serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
                println!("{rendered}");
            }
            None => println!("no output"),
        }
    }
    Ok(())
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
