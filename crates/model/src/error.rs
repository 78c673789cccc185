use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    #[error("Column '{column}' required by {operation} is missing from table '{table}'")]
    MissingColumn {
        table: String,
        column: String,
        operation: String,
    },

    #[error("Column '{column}' is not part of table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("Column '{column}' appears more than once in table '{table}'")]
    DuplicateColumn { table: String, column: String },

    #[error("Column '{column}' has {actual} values but the table has {expected} rows")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("Schema mismatch: expected columns {expected:?}, found {found:?}")]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Cannot concatenate an empty list of tables")]
    EmptyConcat,
}
