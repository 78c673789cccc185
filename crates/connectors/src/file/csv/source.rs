use crate::file::csv::{
    error::FileError,
    metadata::{CsvColumnMetadata, CsvMetadata},
};
use model::{
    core::{data_type::DataType, value::Value},
    records::{
        row::{FieldValue, RowData},
        table::MemTable,
    },
};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::info;

/// Reads a whole CSV file with a header row into a [`MemTable`].
///
/// Empty cells are NULL. Columns with a configured type must parse as that
/// type; every other column gets one type inferred from all of its cells.
pub struct CsvSource {
    path: PathBuf,
    delimiter: char,
    column_types: BTreeMap<String, DataType>,
}

impl CsvSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: ',',
            column_types: BTreeMap::new(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_column_types(mut self, column_types: BTreeMap<String, DataType>) -> Self {
        self.column_types = column_types;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Table named after the file stem.
    pub fn read(&self) -> Result<MemTable, FileError> {
        let name = self
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "csv".to_string());
        self.read_named(&name)
    }

    pub fn read_named(&self, name: &str) -> Result<MemTable, FileError> {
        let start = Instant::now();
        if !self.path.exists() {
            return Err(FileError::NotFound(self.path.display().to_string()));
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(self.delimiter as u8)
            .has_headers(true)
            .from_path(&self.path)?;
        let mut meta = CsvMetadata::from_headers(
            name,
            reader.headers()?,
            &self.column_types,
            self.delimiter,
        )?;

        let records = reader.records().collect::<Result<Vec<_>, _>>()?;
        meta.infer_untyped(&records);

        let mut table = MemTable::new(name, meta.column_names())?;
        for (idx, record) in records.iter().enumerate() {
            // header is line 1
            let row = self.parse_record(record, &meta.columns, idx + 2)?;
            table.push_row(row)?;
        }

        info!(
            path = %self.path.display(),
            rows = table.rows().len(),
            took_ms = start.elapsed().as_millis() as u64,
            "Read CSV source"
        );
        Ok(table)
    }

    fn parse_record(
        &self,
        record: &::csv::StringRecord,
        columns: &[CsvColumnMetadata],
        line: usize,
    ) -> Result<RowData, FileError> {
        let mut fields = Vec::with_capacity(columns.len());
        for col in columns {
            let cell = record.get(col.ordinal).unwrap_or("");
            let data_type = col.data_type.unwrap_or(DataType::String);
            let value = if cell.is_empty() {
                Value::Null
            } else {
                data_type
                    .get_value(cell)
                    .ok_or_else(|| FileError::InvalidValue {
                        row: line,
                        column: col.name.clone(),
                        value: cell.to_string(),
                        data_type,
                    })?
            };
            fields.push(FieldValue::new(col.name.clone(), value));
        }
        Ok(RowData::new(fields))
    }
}
