use crate::{
    curation::{
        cdc::{CdcOptions, CdcSummary, DeleteMode, resolve_cdc_with_summary},
        history::{HistoryOptions, build_history},
    },
    error::CurationError,
    incremental::{
        late_data::{LateDataPolicy, LateDataReport, handle_late_data},
        quarantine::QuarantineWriter,
        watermark::{WatermarkManager, WatermarkSource},
    },
};
use engine_core::metrics::{CurationMetrics, MetricsSnapshot};
use model::{core::value::Value, records::table::Table};
use serde::Serialize;
use tracing::{debug, info};

/// Which consumable representation a run produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurationMode {
    /// One current-state row per key (SCD Type 1).
    Current(CdcOptions),
    /// Full version chain per key (SCD Type 2).
    History(HistoryOptions),
}

/// Watermark bookkeeping for incremental runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncrementalSettings {
    pub system: String,
    pub entity: String,
    pub ts_column: String,
    pub source: WatermarkSource,
    pub target_path: Option<String>,
    pub late_policy: LateDataPolicy,
}

impl IncrementalSettings {
    pub fn new(system: &str, entity: &str, ts_column: &str) -> Self {
        Self {
            system: system.to_string(),
            entity: entity.to_string(),
            ts_column: ts_column.to_string(),
            source: WatermarkSource::default(),
            target_path: None,
            late_policy: LateDataPolicy::default(),
        }
    }

    pub fn with_source(mut self, source: WatermarkSource, target_path: Option<String>) -> Self {
        self.source = source;
        self.target_path = target_path;
        self
    }

    pub fn with_late_policy(mut self, policy: LateDataPolicy) -> Self {
        self.late_policy = policy;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurationReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub late_data: Option<LateDataReport>,
    pub cdc: Option<CdcSummary>,
    pub previous_watermark: Option<String>,
    pub new_watermark: Option<String>,
    pub watermark_advanced: bool,
    pub dry_run: bool,
    pub metrics: MetricsSnapshot,
}

#[derive(Debug, Clone)]
pub struct CurationOutput<T> {
    pub table: T,
    pub report: CurationReport,
}

/// Runs one batch through late-data handling, curation and watermark advance.
pub struct Curator {
    mode: CurationMode,
    incremental: Option<(WatermarkManager, IncrementalSettings)>,
    quarantine: Option<QuarantineWriter>,
    metrics: CurationMetrics,
    dry_run: bool,
}

impl Curator {
    pub fn new(mode: CurationMode) -> Self {
        Self {
            mode,
            incremental: None,
            quarantine: None,
            metrics: CurationMetrics::new(),
            dry_run: false,
        }
    }

    pub fn with_incremental(mut self, manager: WatermarkManager, settings: IncrementalSettings) -> Self {
        self.incremental = Some((manager, settings));
        self
    }

    pub fn with_quarantine(mut self, writer: QuarantineWriter) -> Self {
        self.quarantine = Some(writer);
        self
    }

    /// Dry runs curate as usual but persist neither watermarks nor quarantined rows.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn metrics(&self) -> &CurationMetrics {
        &self.metrics
    }

    pub async fn run<T: Table>(&self, table: &T) -> Result<CurationOutput<T>, CurationError> {
        info!(table = table.name(), rows = table.num_rows(), dry_run = self.dry_run, "Starting curation");
        self.metrics.increment_read(table.num_rows() as u64);

        let mut report = CurationReport {
            rows_in: table.num_rows(),
            dry_run: self.dry_run,
            ..Default::default()
        };

        let accepted = match &self.incremental {
            Some((manager, settings)) => {
                let previous = manager
                    .resolve_watermark(
                        &settings.system,
                        &settings.entity,
                        settings.source,
                        settings.target_path.as_deref(),
                    )
                    .await?;
                let outcome = handle_late_data(
                    table,
                    &settings.ts_column,
                    previous.as_deref(),
                    settings.late_policy,
                )?;
                self.metrics.increment_late(outcome.report.late_rows as u64);

                if let Some(late) = &outcome.quarantined {
                    self.quarantine_rows(late, previous.as_deref())?;
                }
                report.late_data = Some(outcome.report);
                report.previous_watermark = previous;
                outcome.table
            }
            None => table.clone(),
        };

        let curated = match &self.mode {
            CurationMode::Current(options) => {
                let (resolved, summary) = resolve_cdc_with_summary(&accepted, options)?;
                self.metrics.increment_unrecognized(summary.unrecognized as u64);
                if options.delete_mode == DeleteMode::Tombstone {
                    self.metrics.increment_tombstones(summary.deletes as u64);
                }
                report.cdc = Some(summary);
                resolved
            }
            CurationMode::History(options) => build_history(&accepted, options)?,
        };

        if let Some((manager, settings)) = &self.incremental {
            report.new_watermark = self
                .advance_watermark(manager, settings, &accepted, report.previous_watermark.as_deref())
                .await?;
            report.watermark_advanced = report.new_watermark.is_some();
        }

        self.metrics.increment_written(curated.num_rows() as u64);
        report.rows_out = curated.num_rows();
        report.metrics = self.metrics.snapshot();

        info!(
            table = curated.name(),
            rows_in = report.rows_in,
            rows_out = report.rows_out,
            watermark = ?report.new_watermark,
            "Curation complete"
        );
        Ok(CurationOutput {
            table: curated,
            report,
        })
    }

    fn quarantine_rows<T: Table>(&self, late: &T, watermark: Option<&str>) -> Result<(), CurationError> {
        match &self.quarantine {
            Some(writer) if !self.dry_run => {
                let written = writer.write(late, "late_data", watermark)?;
                self.metrics.increment_quarantined(written as u64);
            }
            Some(_) => debug!(rows = late.num_rows(), "Dry run, not writing quarantined rows"),
            None => debug!(rows = late.num_rows(), "No quarantine sink configured, discarding late rows"),
        }
        Ok(())
    }

    /// Saves the highest accepted timestamp when it moves past `previous`.
    /// Returns the new value, or `None` when nothing was saved.
    async fn advance_watermark<T: Table>(
        &self,
        manager: &WatermarkManager,
        settings: &IncrementalSettings,
        accepted: &T,
        previous: Option<&str>,
    ) -> Result<Option<String>, CurationError> {
        let Some(candidate) = max_timestamp(accepted, &settings.ts_column)? else {
            debug!(entity = %settings.entity, "No accepted timestamps, watermark unchanged");
            return Ok(None);
        };

        if let Some(prev) = previous {
            let prev = Value::coerce_like(prev, &candidate);
            if candidate.total_cmp(&prev).is_le() {
                debug!(entity = %settings.entity, %candidate, "Watermark not advanced");
                return Ok(None);
            }
        }

        let Some(value) = candidate.render() else {
            return Ok(None);
        };
        if self.dry_run {
            info!(entity = %settings.entity, watermark = %value, "Dry run, watermark not saved");
        } else {
            manager
                .save_watermark(&settings.system, &settings.entity, &value)
                .await?;
        }
        Ok(Some(value))
    }
}

/// Greatest non-null value of `column`.
pub fn max_timestamp<T: Table>(table: &T, column: &str) -> Result<Option<Value>, CurationError> {
    let idx = table.require_columns(&[column], "max_timestamp")?[0];
    Ok((0..table.num_rows())
        .map(|row| table.value(row, idx))
        .filter(|v| !v.is_null())
        .max_by(|a, b| a.total_cmp(b))
        .cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::state::file_store::FileStateStore;
    use model::records::{row::RowData, table::MemTable};
    use std::sync::Arc;
    use tempfile::tempdir;

    fn env(id: i64, op: &str, ts: &str) -> RowData {
        RowData::from_pairs([
            ("id", Value::Int(id)),
            ("op", Value::from(op)),
            ("ts", Value::infer(ts)),
        ])
    }

    fn batch(rows: Vec<RowData>) -> MemTable {
        MemTable::from_rows("orders", rows).unwrap()
    }

    fn curator(state: &std::path::Path, policy: LateDataPolicy) -> Curator {
        let manager = WatermarkManager::new(Arc::new(FileStateStore::new(state)));
        Curator::new(CurationMode::Current(CdcOptions::new(["id"], ["ts"])))
            .with_incremental(
                manager,
                IncrementalSettings::new("shop", "orders", "ts").with_late_policy(policy),
            )
    }

    #[tokio::test]
    async fn first_run_sets_watermark_and_second_drops_late_rows() {
        let dir = tempdir().unwrap();
        let c = curator(dir.path(), LateDataPolicy::Ignore);

        let out = c
            .run(&batch(vec![
                env(1, "I", "2025-01-01T00:00:00Z"),
                env(2, "I", "2025-01-03T00:00:00Z"),
            ]))
            .await
            .unwrap();
        assert_eq!(out.table.num_rows(), 2);
        assert_eq!(out.report.new_watermark.as_deref(), Some("2025-01-03T00:00:00Z"));

        let out = c
            .run(&batch(vec![
                env(1, "U", "2025-01-02T00:00:00Z"),
                env(3, "I", "2025-01-04T00:00:00Z"),
            ]))
            .await
            .unwrap();
        assert_eq!(out.report.previous_watermark.as_deref(), Some("2025-01-03T00:00:00Z"));
        assert_eq!(out.report.late_data.as_ref().unwrap().late_rows, 1);
        assert_eq!(out.table.column_values("id").unwrap(), vec![Value::Int(3)]);
        assert_eq!(out.report.new_watermark.as_deref(), Some("2025-01-04T00:00:00Z"));
    }

    #[tokio::test]
    async fn watermark_never_moves_backwards() {
        let dir = tempdir().unwrap();
        let c = curator(dir.path(), LateDataPolicy::Warn);

        c.run(&batch(vec![env(1, "I", "2025-01-05T00:00:00Z")])).await.unwrap();
        let out = c
            .run(&batch(vec![env(2, "I", "2025-01-01T00:00:00Z")]))
            .await
            .unwrap();

        assert_eq!(out.table.num_rows(), 1);
        assert!(!out.report.watermark_advanced);
        let store = FileStateStore::new(dir.path());
        let manager = WatermarkManager::new(Arc::new(store));
        let wm = manager.get_watermark("shop", "orders").await.unwrap().unwrap();
        assert_eq!(wm.last_value, "2025-01-05T00:00:00Z");
    }

    #[tokio::test]
    async fn dry_run_persists_nothing() {
        let dir = tempdir().unwrap();
        let quarantine = dir.path().join("late.jsonl");
        let manager = WatermarkManager::new(Arc::new(FileStateStore::new(dir.path())));
        manager
            .save_watermark("shop", "orders", "2025-01-03T00:00:00Z")
            .await
            .unwrap();

        let c = curator(dir.path(), LateDataPolicy::Quarantine)
            .with_quarantine(QuarantineWriter::new(&quarantine, "shop", "orders"))
            .with_dry_run(true);
        let out = c
            .run(&batch(vec![
                env(1, "I", "2025-01-01T00:00:00Z"),
                env(2, "I", "2025-01-09T00:00:00Z"),
            ]))
            .await
            .unwrap();

        assert_eq!(out.report.new_watermark.as_deref(), Some("2025-01-09T00:00:00Z"));
        assert!(!quarantine.exists());
        let wm = manager.get_watermark("shop", "orders").await.unwrap().unwrap();
        assert_eq!(wm.last_value, "2025-01-03T00:00:00Z");
    }

    #[tokio::test]
    async fn quarantined_rows_are_written_and_counted() {
        let dir = tempdir().unwrap();
        let quarantine = dir.path().join("q").join("late.jsonl");
        let manager = WatermarkManager::new(Arc::new(FileStateStore::new(dir.path())));
        manager.save_watermark("shop", "orders", "2025-01-03").await.unwrap();

        let c = curator(dir.path(), LateDataPolicy::Quarantine)
            .with_quarantine(QuarantineWriter::new(&quarantine, "shop", "orders"));
        let out = c
            .run(&batch(vec![
                env(1, "I", "2025-01-01T00:00:00Z"),
                env(2, "D", "2025-01-04T00:00:00Z"),
            ]))
            .await
            .unwrap();

        assert!(out.table.is_empty());
        assert_eq!(out.report.metrics.rows_quarantined, 1);
        assert_eq!(out.report.cdc.unwrap().deletes, 1);
        assert_eq!(std::fs::read_to_string(&quarantine).unwrap().lines().count(), 1);
    }

    #[tokio::test]
    async fn reject_policy_fails_without_touching_state() {
        let dir = tempdir().unwrap();
        let c = curator(dir.path(), LateDataPolicy::Reject);
        c.run(&batch(vec![env(1, "I", "2025-01-05T00:00:00Z")])).await.unwrap();

        let err = c
            .run(&batch(vec![env(1, "U", "2025-01-01T00:00:00Z")]))
            .await
            .unwrap_err();
        assert!(matches!(err, CurationError::LateDataRejected { count: 1, .. }));
    }

    #[tokio::test]
    async fn history_mode_without_watermark() {
        let c = Curator::new(CurationMode::History(HistoryOptions::new(["id"], "ts")));
        let out = c
            .run(&batch(vec![
                env(1, "I", "2025-01-01T00:00:00Z"),
                env(1, "U", "2025-01-02T00:00:00Z"),
            ]))
            .await
            .unwrap();

        assert_eq!(out.table.num_rows(), 2);
        assert!(out.report.late_data.is_none());
        assert_eq!(out.report.new_watermark, None);
        assert_eq!(out.report.metrics.rows_written, 2);
    }

    #[test]
    fn max_timestamp_ignores_nulls() {
        let t = batch(vec![env(1, "I", "5"), env(2, "I", ""), env(3, "I", "7")]);
        assert_eq!(max_timestamp(&t, "ts").unwrap(), Some(Value::Int(7)));
    }
}
