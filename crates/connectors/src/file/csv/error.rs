use model::{core::data_type::DataType, error::TableError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid file format: {0}")]
    InvalidFormat(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV parsing error: {0}")]
    CsvError(#[from] ::csv::Error),
    #[error("Row {row}, column '{column}': cannot read '{value}' as {data_type}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
        data_type: DataType,
    },
    #[error("Table error: {0}")]
    Table(#[from] TableError),
}
