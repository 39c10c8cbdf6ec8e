pub mod error;
pub mod load;

pub use error::ConfigError;
pub use load::{load_config, validate_config, API_KEY_ENV};

use crate::model::AgentProfile;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_turns() -> usize {
    10
}

/// Settings for the model every agent talks to. One model serves all
/// agents; per-agent configs may override sampling only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    pub base_url: String,
    /// Sourced from the environment at load time, never from the file.
    #[serde(skip)]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub request_timeout_seconds: Option<u64>,
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_seconds.map(Duration::from_secs)
    }
}

/// Per-agent overrides. A missing prompt falls back to the embedded
/// default for that agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryConfig {
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,
    #[serde(default)]
    pub save_file: Option<PathBuf>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            save_file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrometheusConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub main_agent: AgentConfig,
    #[serde(default)]
    pub analyzer: AgentConfig,
    #[serde(default)]
    pub planner: AgentConfig,
    #[serde(default)]
    pub reflector: AgentConfig,
    #[serde(default)]
    pub think_agent: AgentConfig,
    #[serde(default)]
    pub code_agent: AgentConfig,
}

impl PrometheusConfig {
    /// Merges the shared model settings with one agent's overrides.
    pub fn profile(&self, name: &str, agent: &AgentConfig, default_prompt: &str) -> AgentProfile {
        AgentProfile {
            name: name.to_string(),
            model: self.model.name.clone(),
            system_prompt: agent
                .prompt
                .clone()
                .unwrap_or_else(|| default_prompt.to_string()),
            temperature: agent.temperature.unwrap_or(self.model.temperature),
            max_tokens: agent.max_tokens.unwrap_or(self.model.max_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> PrometheusConfig {
        serde_yaml::from_str(
            r#"
model:
  name: gpt-4o-mini
  base_url: https://api.example.com/v1/chat/completions
  temperature: 0.3
history:
  max_turns: 5
planner:
  temperature: 0.0
  max_tokens: 2048
think_agent:
  prompt: custom think prompt
"#,
        )
        .expect("config")
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config = sample_config();
        assert_eq!(config.model.max_tokens, 4096);
        assert_eq!(config.history.max_turns, 5);
        assert!(config.history.save_file.is_none());
        assert_eq!(config.main_agent, AgentConfig::default());
    }

    #[test]
    fn profile_merges_overrides_over_model_settings() {
        let config = sample_config();
        let planner = config.profile("planner", &config.planner, "default planner prompt");
        assert_eq!(planner.temperature, 0.0);
        assert_eq!(planner.max_tokens, 2048);
        assert_eq!(planner.system_prompt, "default planner prompt");

        let think = config.profile("think", &config.think_agent, "default think prompt");
        assert_eq!(think.system_prompt, "custom think prompt");
        assert_eq!(think.temperature, 0.3);
    }

    #[test]
    fn validation_rejects_out_of_range_sampling() {
        let mut config = sample_config();
        config.model.api_key = "key".to_string();
        assert!(validate_config(&config).is_ok());

        config.planner.temperature = Some(1.5);
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::Validation(_))
        ));

        let mut config = sample_config();
        config.model.max_tokens = 20_000;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn api_key_never_serializes() {
        let mut config = sample_config();
        config.model.api_key = "secret".to_string();
        let dumped = serde_yaml::to_string(&config).expect("encode");
        assert!(!dumped.contains("secret"));
    }
}
