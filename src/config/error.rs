#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("model api key environment variable `PROMETHEUS_API_KEY` is not set")]
    MissingApiKey,
    #[error("config validation failed: {0}")]
    Validation(String),
}
