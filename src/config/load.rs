use super::{ConfigError, PrometheusConfig};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Environment variable carrying the model api key. The key never lives
/// in the config file.
pub const API_KEY_ENV: &str = "PROMETHEUS_API_KEY";

pub fn load_config(path: &Path) -> Result<PrometheusConfig, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: PrometheusConfig =
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;

    config.model.api_key =
        std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey)?;
    validate_config(&config)?;
    debug!(path = %path.display(), "loaded config");
    Ok(config)
}

pub fn validate_config(config: &PrometheusConfig) -> Result<(), ConfigError> {
    if config.model.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "model.name must be non-empty".to_string(),
        ));
    }
    if config.model.base_url.trim().is_empty() {
        return Err(ConfigError::Validation(
            "model.base_url must be non-empty".to_string(),
        ));
    }
    validate_sampling(
        "model",
        Some(config.model.temperature),
        Some(config.model.max_tokens),
    )?;

    for (name, agent) in [
        ("main_agent", &config.main_agent),
        ("analyzer", &config.analyzer),
        ("planner", &config.planner),
        ("reflector", &config.reflector),
        ("think_agent", &config.think_agent),
        ("code_agent", &config.code_agent),
    ] {
        validate_sampling(name, agent.temperature, agent.max_tokens)?;
    }

    if config.history.max_turns == 0 {
        return Err(ConfigError::Validation(
            "history.max_turns must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn validate_sampling(
    name: &str,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
) -> Result<(), ConfigError> {
    if let Some(temperature) = temperature {
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::Validation(format!(
                "{name}: temperature must be between 0 and 1, got {temperature}"
            )));
        }
    }
    if let Some(max_tokens) = max_tokens {
        if max_tokens == 0 || max_tokens > 8192 {
            return Err(ConfigError::Validation(format!(
                "{name}: max_tokens must be between 1 and 8192, got {max_tokens}"
            )));
        }
    }
    Ok(())
}
