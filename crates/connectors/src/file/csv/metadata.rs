use crate::file::csv::error::FileError;
use model::core::data_type::DataType;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize)]
pub struct CsvColumnMetadata {
    pub name: String,
    /// `None` until the reader infers a type from the column's cells.
    pub data_type: Option<DataType>,
    pub ordinal: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CsvMetadata {
    pub name: String,
    pub columns: Vec<CsvColumnMetadata>,
    pub delimiter: char,
}

impl CsvMetadata {
    /// Binds configured column types to the header row.
    ///
    /// Header names are trimmed but otherwise kept verbatim; duplicates are
    /// rejected. Configured types for columns the file does not have are
    /// reported and skipped.
    pub fn from_headers(
        name: &str,
        headers: &::csv::StringRecord,
        types: &BTreeMap<String, DataType>,
        delimiter: char,
    ) -> Result<Self, FileError> {
        let mut seen = HashSet::new();
        let mut columns = Vec::with_capacity(headers.len());
        for (ordinal, header) in headers.iter().enumerate() {
            let column = header.trim().to_string();
            if column.is_empty() {
                return Err(FileError::InvalidFormat(format!(
                    "{name}: header {ordinal} is empty"
                )));
            }
            if !seen.insert(column.clone()) {
                return Err(FileError::InvalidFormat(format!(
                    "{name}: duplicate header '{column}'"
                )));
            }
            columns.push(CsvColumnMetadata {
                data_type: types.get(&column).copied(),
                name: column,
                ordinal,
            });
        }

        for configured in types.keys().filter(|c| !seen.contains(*c)) {
            warn!(file = name, column = %configured, "Typed column not present in CSV header");
        }

        Ok(CsvMetadata {
            name: name.to_string(),
            columns,
            delimiter,
        })
    }

    /// Types every unconfigured column from all of its cells at once, so a
    /// column never mixes `001` as text with `1` as a number.
    pub fn infer_untyped(&mut self, records: &[::csv::StringRecord]) {
        for col in self.columns.iter_mut().filter(|c| c.data_type.is_none()) {
            let inferred =
                DataType::infer_column(records.iter().map(|r| r.get(col.ordinal).unwrap_or("")));
            debug!(file = %self.name, column = %col.name, data_type = inferred.name(), "Inferred CSV column type");
            col.data_type = Some(inferred);
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
