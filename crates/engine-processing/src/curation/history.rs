use crate::{curation::dedup::ensure_columns, error::CurationError};
use model::{core::value::Value, records::table::Table};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryOptions {
    pub keys: Vec<String>,
    pub ts_column: String,
    pub effective_from: String,
    pub effective_to: String,
    pub is_current: String,
}

impl HistoryOptions {
    pub fn new<K>(keys: K, ts_column: impl Into<String>) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            ts_column: ts_column.into(),
            effective_from: "effective_from".to_string(),
            effective_to: "effective_to".to_string(),
            is_current: "is_current".to_string(),
        }
    }

    pub fn with_column_names(
        mut self,
        effective_from: impl Into<String>,
        effective_to: impl Into<String>,
        is_current: impl Into<String>,
    ) -> Self {
        self.effective_from = effective_from.into();
        self.effective_to = effective_to.into();
        self.is_current = is_current.into();
        self
    }
}

/// Builds an SCD Type 2 version chain for every key.
///
/// Rows are not deduplicated and operation codes are not interpreted: every
/// input row becomes one version. Within a key versions are ordered by the
/// timestamp, ties keeping their input order, and the last one is current.
pub fn build_history<T: Table>(table: &T, options: &HistoryOptions) -> Result<T, CurationError> {
    let keys: Vec<&str> = options.keys.iter().map(String::as_str).collect();
    ensure_columns(&keys, "build_history", "key")?;
    let ts_idx = table.require_columns(&[options.ts_column.as_str()], "build_history")?;

    let partitions = table.partition_by(&keys)?;
    let mut order = Vec::with_capacity(table.num_rows());
    let mut effective_from = Vec::with_capacity(table.num_rows());
    let mut effective_to = Vec::with_capacity(table.num_rows());
    let mut is_current = Vec::with_capacity(table.num_rows());

    for mut rows in partitions {
        table.sort_rows(&mut rows, &ts_idx, false);
        for (pos, &row) in rows.iter().enumerate() {
            let next = rows.get(pos + 1);
            effective_from.push(table.value(row, ts_idx[0]).clone());
            effective_to.push(
                next.map(|&n| table.value(n, ts_idx[0]).clone())
                    .unwrap_or(Value::Null),
            );
            is_current.push(Value::Boolean(next.is_none()));
            order.push(row);
        }
    }

    let versions = table
        .take(&order)
        .with_column(&options.effective_from, effective_from)?
        .with_column(&options.effective_to, effective_to)?
        .with_column(&options.is_current, is_current)?;

    debug!(
        table = versions.name(),
        versions = versions.num_rows(),
        "Built history"
    );
    Ok(versions)
}

/// Keeps only the rows flagged current in a history table.
pub fn current_versions<T: Table>(history: &T, is_current: &str) -> Result<T, CurationError> {
    let idx = history.require_columns(&[is_current], "current_versions")?[0];
    Ok(history.filter_rows(|row| history.value(row, idx).as_bool() == Some(true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::records::{row::RowData, table::MemTable};

    fn version(id: impl Into<Value>, v: &str, ts: i64) -> RowData {
        RowData::from_pairs([
            ("id", id.into()),
            ("v", Value::from(v)),
            ("ts", Value::Int(ts)),
        ])
    }

    fn opts() -> HistoryOptions {
        HistoryOptions::new(["id"], "ts")
    }

    #[test]
    fn builds_contiguous_chain() {
        let t = MemTable::from_rows(
            "h",
            vec![version(1, "C", 9), version(1, "A", 1), version(1, "B", 5)],
        )
        .unwrap();

        let h = build_history(&t, &opts()).unwrap();
        assert_eq!(
            h.column_values("v").unwrap(),
            vec![Value::from("A"), Value::from("B"), Value::from("C")]
        );
        assert_eq!(
            h.column_values("effective_from").unwrap(),
            vec![Value::Int(1), Value::Int(5), Value::Int(9)]
        );
        assert_eq!(
            h.column_values("effective_to").unwrap(),
            vec![Value::Int(5), Value::Int(9), Value::Null]
        );
        assert_eq!(
            h.column_values("is_current").unwrap(),
            vec![Value::Boolean(false), Value::Boolean(false), Value::Boolean(true)]
        );
    }

    #[test]
    fn identical_timestamps_keep_every_version() {
        let t = MemTable::from_rows("h", vec![version(1, "a", 3), version(1, "b", 3)]).unwrap();
        let h = build_history(&t, &opts()).unwrap();

        assert_eq!(h.num_rows(), 2);
        let current = current_versions(&h, "is_current").unwrap();
        assert_eq!(current.column_values("v").unwrap(), vec![Value::from("b")]);
    }

    #[test]
    fn keys_are_grouped_in_first_appearance_order() {
        let t = MemTable::from_rows(
            "h",
            vec![
                version(2, "x", 2),
                version(1, "a", 1),
                version(2, "y", 1),
                version(Value::Null, "n", 1),
            ],
        )
        .unwrap();

        let h = build_history(&t, &opts()).unwrap();
        assert_eq!(
            h.column_values("v").unwrap(),
            vec![Value::from("y"), Value::from("x"), Value::from("a"), Value::from("n")]
        );
        let current = current_versions(&h, "is_current").unwrap();
        assert_eq!(current.num_rows(), 3);
    }

    #[test]
    fn custom_column_names_and_preserved_columns() {
        let t = MemTable::from_rows(
            "h",
            vec![RowData::from_pairs([
                ("id", Value::Int(1)),
                ("op", Value::from("D")),
                ("ts", Value::Int(4)),
            ])],
        )
        .unwrap();
        let options = opts().with_column_names("valid_from", "valid_to", "current");

        let h = build_history(&t, &options).unwrap();
        assert_eq!(
            h.column_names(),
            &["id", "op", "ts", "valid_from", "valid_to", "current"]
        );
        assert_eq!(h.column_values("op").unwrap(), vec![Value::from("D")]);
    }

    #[test]
    fn missing_timestamp_column_is_an_error() {
        let t = MemTable::from_rows("h", vec![RowData::from_pairs([("id", 1i64)])]).unwrap();
        assert!(build_history(&t, &opts()).is_err());
    }
}
