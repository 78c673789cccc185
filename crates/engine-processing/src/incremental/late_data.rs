use crate::error::CurationError;
use model::{
    core::{data_type::DataType, value::Value},
    records::table::Table,
};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, collections::HashMap, fmt, str::FromStr};
use tracing::{debug, info, warn};

/// What to do with rows whose timestamp is older than the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LateDataPolicy {
    /// Drop late rows.
    #[default]
    Ignore,
    /// Log them and keep every row.
    Warn,
    /// Fail the run.
    Reject,
    /// Divert late rows to a side output.
    Quarantine,
}

impl FromStr for LateDataPolicy {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ignore" => Ok(LateDataPolicy::Ignore),
            "warn" => Ok(LateDataPolicy::Warn),
            "reject" => Ok(LateDataPolicy::Reject),
            "quarantine" => Ok(LateDataPolicy::Quarantine),
            _ => Err(CurationError::UnsupportedLatePolicy(s.to_string())),
        }
    }
}

impl fmt::Display for LateDataPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LateDataPolicy::Ignore => "ignore",
            LateDataPolicy::Warn => "warn",
            LateDataPolicy::Reject => "reject",
            LateDataPolicy::Quarantine => "quarantine",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LateDataReport {
    pub total_rows: usize,
    pub late_rows: usize,
    pub on_time_rows: usize,
    pub oldest_late: Option<Value>,
    pub newest_late: Option<Value>,
}

impl LateDataReport {
    pub fn has_late_data(&self) -> bool {
        self.late_rows > 0
    }
}

#[derive(Debug, Clone)]
pub struct LateDataOutcome<T> {
    /// Rows that continue through the pipeline.
    pub table: T,
    /// Late rows diverted under the quarantine policy.
    pub quarantined: Option<T>,
    pub report: LateDataReport,
}

/// The watermark parsed into the type of each cell it is compared with.
/// Parsing is cached per type since columns are usually homogeneous.
struct WatermarkComparator<'a> {
    raw: &'a str,
    column: &'a str,
    parsed: HashMap<DataType, Value>,
}

impl<'a> WatermarkComparator<'a> {
    fn new(raw: &'a str, column: &'a str) -> Self {
        Self {
            raw,
            column,
            parsed: HashMap::new(),
        }
    }

    /// `None` for NULL cells, which are never late nor new. A watermark that
    /// does not parse as the cell's type is an error rather than a string
    /// comparison that would rank every row against it by type alone.
    fn compare(&mut self, ts: &Value) -> Result<Option<Ordering>, CurationError> {
        if ts.is_null() {
            return Ok(None);
        }
        let data_type = ts.data_type();
        if !self.parsed.contains_key(&data_type) {
            let parsed = Value::try_coerce_like(self.raw, ts).ok_or_else(|| {
                warn!(
                    column = self.column,
                    watermark = self.raw,
                    data_type = data_type.name(),
                    "Watermark does not match column type"
                );
                CurationError::WatermarkTypeMismatch {
                    column: self.column.to_string(),
                    watermark: self.raw.to_string(),
                    data_type: data_type.name().to_string(),
                }
            })?;
            self.parsed.insert(data_type, parsed);
        }
        let watermark = &self.parsed[&data_type];
        Ok(Some(ts.total_cmp(watermark)))
    }

    /// One flag per row, set where the cell compares as `wanted`.
    fn flags<T: Table>(&mut self, table: &T, ts_idx: usize, wanted: Ordering) -> Result<Vec<bool>, CurationError> {
        (0..table.num_rows())
            .map(|row| Ok(self.compare(table.value(row, ts_idx))? == Some(wanted)))
            .collect()
    }
}

fn late_flags<T: Table>(
    table: &T,
    ts_column: &str,
    watermark: Option<&str>,
    operation: &str,
) -> Result<Vec<bool>, CurationError> {
    let ts_idx = table.require_columns(&[ts_column], operation)?[0];
    let Some(raw) = watermark else {
        return Ok(vec![false; table.num_rows()]);
    };

    WatermarkComparator::new(raw, ts_column).flags(table, ts_idx, Ordering::Less)
}

/// Counts rows strictly older than `watermark`. Without a watermark nothing is late.
pub fn detect_late_data<T: Table>(
    table: &T,
    ts_column: &str,
    watermark: Option<&str>,
) -> Result<LateDataReport, CurationError> {
    let flags = late_flags(table, ts_column, watermark, "detect_late_data")?;
    Ok(report_from_flags(table, ts_column, &flags))
}

fn report_from_flags<T: Table>(table: &T, ts_column: &str, flags: &[bool]) -> LateDataReport {
    let mut report = LateDataReport {
        total_rows: table.num_rows(),
        ..Default::default()
    };
    let Some(ts_idx) = table.column_index(ts_column) else {
        return report;
    };

    for (row, _) in flags.iter().enumerate().filter(|(_, late)| **late) {
        let ts = table.value(row, ts_idx);
        report.late_rows += 1;
        if report
            .oldest_late
            .as_ref()
            .is_none_or(|oldest| ts.total_cmp(oldest).is_lt())
        {
            report.oldest_late = Some(ts.clone());
        }
        if report
            .newest_late
            .as_ref()
            .is_none_or(|newest| ts.total_cmp(newest).is_gt())
        {
            report.newest_late = Some(ts.clone());
        }
    }
    report.on_time_rows = report.total_rows - report.late_rows;
    report
}

/// Applies `policy` to the rows older than `watermark`.
pub fn handle_late_data<T: Table>(
    table: &T,
    ts_column: &str,
    watermark: Option<&str>,
    policy: LateDataPolicy,
) -> Result<LateDataOutcome<T>, CurationError> {
    let flags = late_flags(table, ts_column, watermark, "handle_late_data")?;
    let report = report_from_flags(table, ts_column, &flags);

    if !report.has_late_data() {
        return Ok(LateDataOutcome {
            table: table.clone(),
            quarantined: None,
            report,
        });
    }

    let oldest = report
        .oldest_late
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();
    let watermark = watermark.unwrap_or_default();

    match policy {
        LateDataPolicy::Ignore => {
            info!(
                table = table.name(),
                column = ts_column,
                late_rows = report.late_rows,
                watermark,
                "Dropping late rows"
            );
            Ok(LateDataOutcome {
                table: table.filter_rows(|row| !flags[row]),
                quarantined: None,
                report,
            })
        }
        LateDataPolicy::Warn => {
            warn!(
                table = table.name(),
                column = ts_column,
                late_rows = report.late_rows,
                oldest_late = %oldest,
                watermark,
                "Late rows detected, keeping them"
            );
            Ok(LateDataOutcome {
                table: table.clone(),
                quarantined: None,
                report,
            })
        }
        LateDataPolicy::Reject => Err(CurationError::LateDataRejected {
            column: ts_column.to_string(),
            count: report.late_rows,
            oldest,
            watermark: watermark.to_string(),
        }),
        LateDataPolicy::Quarantine => {
            warn!(
                table = table.name(),
                column = ts_column,
                late_rows = report.late_rows,
                watermark,
                "Quarantining late rows"
            );
            Ok(LateDataOutcome {
                table: table.filter_rows(|row| !flags[row]),
                quarantined: Some(table.filter_rows(|row| flags[row])),
                report,
            })
        }
    }
}

/// Rows strictly newer than `watermark`; every row when there is none.
pub fn filter_incremental<T: Table>(
    table: &T,
    ts_column: &str,
    watermark: Option<&str>,
) -> Result<T, CurationError> {
    let ts_idx = table.require_columns(&[ts_column], "filter_incremental")?[0];
    let Some(raw) = watermark else {
        return Ok(table.clone());
    };

    let newer = WatermarkComparator::new(raw, ts_column).flags(table, ts_idx, Ordering::Greater)?;
    let filtered = table.filter_rows(|row| newer[row]);
    debug!(
        table = table.name(),
        rows_in = table.num_rows(),
        rows_out = filtered.num_rows(),
        watermark = raw,
        "Filtered incremental rows"
    );
    Ok(filtered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use model::records::{row::RowData, table::MemTable};
    use tracing_test::traced_test;

    fn events(ts: Vec<Value>) -> MemTable {
        let rows = ts
            .into_iter()
            .enumerate()
            .map(|(i, ts)| RowData::from_pairs([("id", Value::Int(i as i64)), ("ts", ts)]))
            .collect();
        MemTable::from_rows("events", rows).unwrap()
    }

    fn day(d: u32) -> Value {
        Value::Timestamp(Utc.with_ymd_and_hms(2025, 1, d, 0, 0, 0).unwrap())
    }

    #[test]
    fn detects_rows_strictly_before_watermark() {
        let t = events(vec![day(1), day(5), day(3), Value::Null, day(10)]);
        let report = detect_late_data(&t, "ts", Some("2025-01-05T00:00:00Z")).unwrap();

        assert_eq!(report.total_rows, 5);
        assert_eq!(report.late_rows, 2);
        assert_eq!(report.on_time_rows, 3);
        assert_eq!(report.oldest_late, Some(day(1)));
        assert_eq!(report.newest_late, Some(day(3)));
    }

    #[test]
    fn no_watermark_means_nothing_is_late() {
        let t = events(vec![day(1), day(2)]);
        let report = detect_late_data(&t, "ts", None).unwrap();
        assert_eq!(report.late_rows, 0);
        assert_eq!(report.oldest_late, None);
    }

    #[test]
    fn integer_watermarks_compare_numerically() {
        let t = events(vec![Value::Int(9), Value::Int(10), Value::Int(100)]);
        let report = detect_late_data(&t, "ts", Some("10")).unwrap();
        assert_eq!(report.late_rows, 1);
        assert_eq!(report.oldest_late, Some(Value::Int(9)));
    }

    #[test]
    fn ignore_drops_late_rows() {
        let t = events(vec![day(1), day(6)]);
        let out = handle_late_data(&t, "ts", Some("2025-01-05"), LateDataPolicy::Ignore).unwrap();
        assert_eq!(out.table.column_values("ts").unwrap(), vec![day(6)]);
        assert!(out.quarantined.is_none());
    }

    #[traced_test]
    #[test]
    fn warn_keeps_everything_and_logs() {
        let t = events(vec![day(1), day(6)]);
        let out = handle_late_data(&t, "ts", Some("2025-01-05"), LateDataPolicy::Warn).unwrap();
        assert_eq!(out.table.num_rows(), 2);
        assert_eq!(out.report.late_rows, 1);
        assert!(logs_contain("Late rows detected"));
    }

    #[test]
    fn reject_reports_count_and_oldest() {
        let t = events(vec![day(2), day(1), day(6)]);
        let err =
            handle_late_data(&t, "ts", Some("2025-01-05"), LateDataPolicy::Reject).unwrap_err();
        match err {
            CurationError::LateDataRejected { count, oldest, .. } => {
                assert_eq!(count, 2);
                assert!(oldest.starts_with("2025-01-01"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reject_passes_when_nothing_is_late() {
        let t = events(vec![day(6)]);
        let out = handle_late_data(&t, "ts", Some("2025-01-05"), LateDataPolicy::Reject).unwrap();
        assert_eq!(out.table.num_rows(), 1);
    }

    #[test]
    fn quarantine_splits_rows() {
        let t = events(vec![day(1), day(6), day(2)]);
        let out =
            handle_late_data(&t, "ts", Some("2025-01-05"), LateDataPolicy::Quarantine).unwrap();
        assert_eq!(out.table.column_values("id").unwrap(), vec![Value::Int(1)]);
        assert_eq!(
            out.quarantined.unwrap().column_values("id").unwrap(),
            vec![Value::Int(0), Value::Int(2)]
        );
    }

    #[test]
    fn filter_incremental_is_strict_and_skips_nulls() {
        let t = events(vec![day(5), day(6), Value::Null]);
        let out = filter_incremental(&t, "ts", Some("2025-01-05T00:00:00Z")).unwrap();
        assert_eq!(out.column_values("ts").unwrap(), vec![day(6)]);

        let all = filter_incremental(&t, "ts", None).unwrap();
        assert_eq!(all.num_rows(), 3);
    }

    #[traced_test]
    #[test]
    fn watermark_of_another_type_is_an_error() {
        let t = events(vec![Value::Int(1), Value::Int(2)]);

        let err = handle_late_data(&t, "ts", Some("2025-01-05T00:00:00Z"), LateDataPolicy::Ignore)
            .unwrap_err();
        match err {
            CurationError::WatermarkTypeMismatch { column, data_type, .. } => {
                assert_eq!(column, "ts");
                assert_eq!(data_type, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(logs_contain("Watermark does not match column type"));
        assert!(filter_incremental(&t, "ts", Some("yesterday")).is_err());

        let text = events(vec![Value::from("b")]);
        assert_eq!(detect_late_data(&text, "ts", Some("a")).unwrap().late_rows, 0);
    }

    #[test]
    fn policy_names_parse() {
        assert_eq!("Quarantine".parse::<LateDataPolicy>().unwrap(), LateDataPolicy::Quarantine);
        assert!("drop".parse::<LateDataPolicy>().is_err());
    }

    #[test]
    fn missing_ts_column_is_an_error() {
        let t = events(vec![day(1)]);
        assert!(detect_late_data(&t, "updated_at", Some("x")).is_err());
    }
}
