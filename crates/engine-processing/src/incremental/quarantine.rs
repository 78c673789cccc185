use crate::error::QuarantineError;
use chrono::{DateTime, Utc};
use model::records::table::Table;
use serde::Serialize;
use std::{
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info};
use uuid::Uuid;

/// One diverted row, as written to the quarantine file.
#[derive(Debug, Clone, Serialize)]
pub struct QuarantinedRow {
    pub id: Uuid,
    pub system: String,
    pub entity: String,
    pub reason: String,
    pub watermark: Option<String>,
    pub quarantined_at: DateTime<Utc>,
    pub row: serde_json::Map<String, serde_json::Value>,
}

/// Appends quarantined rows to a JSONL file (one JSON object per line).
pub struct QuarantineWriter {
    path: PathBuf,
    system: String,
    entity: String,
}

impl QuarantineWriter {
    pub fn new(path: impl AsRef<Path>, system: &str, entity: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            system: system.to_string(),
            entity: entity.to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write<T: Table>(
        &self,
        table: &T,
        reason: &str,
        watermark: Option<&str>,
    ) -> Result<usize, QuarantineError> {
        if table.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);

        let quarantined_at = Utc::now();
        for row in 0..table.num_rows() {
            let record = QuarantinedRow {
                id: Uuid::new_v4(),
                system: self.system.clone(),
                entity: self.entity.clone(),
                reason: reason.to_string(),
                watermark: watermark.map(str::to_string),
                quarantined_at,
                row: table
                    .column_names()
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| (name.clone(), table.value(row, idx).to_json()))
                    .collect(),
            };
            let json = serde_json::to_string(&record)?;
            writeln!(out, "{json}")?;
            debug!(id = %record.id, path = %self.path.display(), "Quarantined row");
        }
        out.flush()?;

        info!(
            rows = table.num_rows(),
            path = %self.path.display(),
            reason,
            "Wrote quarantined rows"
        );
        Ok(table.num_rows())
    }
}
