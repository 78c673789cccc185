use thiserror::Error;

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to access state directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize watermark: {0}")]
    Serialization(String),

    #[error("Sled state store error: {0}")]
    Sled(#[from] sled::Error),
}
