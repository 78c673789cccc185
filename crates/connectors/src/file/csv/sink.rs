use crate::file::csv::error::FileError;
use model::records::table::Table;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes a table as CSV with a header row. NULL becomes an empty cell and
/// timestamps are written as RFC 3339.
pub struct CsvSink {
    path: PathBuf,
    delimiter: char,
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: ',',
        }
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the file with `table`. Returns the number of data rows written.
    pub fn write<T: Table>(&self, table: &T) -> Result<usize, FileError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = ::csv::WriterBuilder::new()
            .delimiter(self.delimiter as u8)
            .from_path(&self.path)?;
        writer.write_record(table.column_names())?;

        let width = table.column_names().len();
        for row in 0..table.num_rows() {
            let cells = (0..width).map(|col| table.value(row, col).render().unwrap_or_default());
            writer.write_record(cells)?;
        }
        writer.flush()?;

        info!(
            path = %self.path.display(),
            rows = table.num_rows(),
            "Wrote CSV output"
        );
        Ok(table.num_rows())
    }
}
