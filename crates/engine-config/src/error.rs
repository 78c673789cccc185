use engine_core::error::StateStoreError;
use thiserror::Error;

/// Errors raised while loading or validating a curation config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config as YAML: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid curation config:\n  - {}", .0.join("\n  - "))]
    ValidationFailed(Vec<String>),

    #[error("Failed to open state store: {0}")]
    State(#[from] StateStoreError),
}
