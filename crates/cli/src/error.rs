use connectors::file::csv::error::FileError;
use engine_config::error::ConfigError;
use engine_core::error::StateStoreError;
use engine_processing::error::CurationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Curation failed: {0}")]
    Curation(#[from] CurationError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}
