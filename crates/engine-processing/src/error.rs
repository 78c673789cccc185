use engine_core::error::StateStoreError;
use model::error::TableError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CurationError {
    #[error(transparent)]
    Table(#[from] TableError),

    #[error("{operation} requires at least one input table")]
    EmptyInput { operation: String },

    #[error("{operation} requires at least one {what} column")]
    NoColumns { operation: String, what: String },

    #[error("Unsupported delete mode '{0}' (expected ignore, hard_delete or tombstone)")]
    UnsupportedDeleteMode(String),

    #[error("Unsupported late data policy '{0}' (expected ignore, warn, reject or quarantine)")]
    UnsupportedLatePolicy(String),

    #[error("Unsupported watermark source '{0}' (expected local, destination or auto)")]
    UnsupportedWatermarkSource(String),

    #[error(
        "Rejected {count} late rows in column '{column}' (oldest {oldest}, watermark {watermark})"
    )]
    LateDataRejected {
        column: String,
        count: usize,
        oldest: String,
        watermark: String,
    },

    #[error("Watermark '{watermark}' cannot be compared with {data_type} values in column '{column}'")]
    WatermarkTypeMismatch {
        column: String,
        watermark: String,
        data_type: String,
    },

    #[error("Cannot read destination watermark at {path}: {reason}")]
    Destination { path: String, reason: String },

    #[error("Watermark state error: {0}")]
    State(#[from] StateStoreError),

    #[error("Failed to write quarantined rows: {0}")]
    Quarantine(#[from] QuarantineError),
}

#[derive(Error, Debug)]
pub enum QuarantineError {
    #[error("Failed to write to file: {0}")]
    FileWrite(#[from] std::io::Error),

    #[error("Failed to serialize quarantined row: {0}")]
    Serialization(#[from] serde_json::Error),
}
