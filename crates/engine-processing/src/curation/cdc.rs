//! Collapses keyed insert/update/delete envelopes into current-state rows.

use crate::{
    curation::dedup::{Pick, dedupe_to, ensure_columns},
    error::CurationError,
};
use model::{core::value::Value, records::table::Table};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use tracing::{debug, warn};

/// Column added in tombstone mode.
pub const DELETED_COLUMN: &str = "_deleted";

/// Operation carried by an envelope, after classification against the
/// configured codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Insert,
    Update,
    Delete,
    /// Anything that is not an exact match of a configured code, including
    /// NULL, empty strings, other casings and padded codes.
    Unrecognized(String),
}

impl Operation {
    pub fn is_upsert(&self) -> bool {
        matches!(self, Operation::Insert | Operation::Update)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationCodes {
    pub insert: String,
    pub update: String,
    pub delete: String,
}

impl Default for OperationCodes {
    fn default() -> Self {
        Self {
            insert: "I".to_string(),
            update: "U".to_string(),
            delete: "D".to_string(),
        }
    }
}

impl OperationCodes {
    /// Case-sensitive exact match against the cell's text, so a column read
    /// as numbers still matches codes such as `"1"`. NULL never matches.
    pub fn classify(&self, raw: &Value) -> Operation {
        let Some(code) = raw.render() else {
            return Operation::Unrecognized(raw.to_string());
        };
        if code == self.insert {
            Operation::Insert
        } else if code == self.update {
            Operation::Update
        } else if code == self.delete {
            Operation::Delete
        } else {
            Operation::Unrecognized(code)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Deleted and unrecognized keys are filtered out.
    #[default]
    Ignore,
    /// Same rows as `Ignore`; tells storage writers to remove deleted keys
    /// physically.
    HardDelete,
    /// Every key is kept and flagged through `_deleted`.
    Tombstone,
}

impl FromStr for DeleteMode {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ignore" => Ok(DeleteMode::Ignore),
            "hard_delete" => Ok(DeleteMode::HardDelete),
            "tombstone" => Ok(DeleteMode::Tombstone),
            other => Err(CurationError::UnsupportedDeleteMode(other.to_string())),
        }
    }
}

impl fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeleteMode::Ignore => "ignore",
            DeleteMode::HardDelete => "hard_delete",
            DeleteMode::Tombstone => "tombstone",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdcOptions {
    pub keys: Vec<String>,
    pub order_by: Vec<String>,
    pub delete_mode: DeleteMode,
    pub op_column: String,
    pub codes: OperationCodes,
}

impl CdcOptions {
    pub fn new<K, O>(keys: K, order_by: O) -> Self
    where
        K: IntoIterator,
        K::Item: Into<String>,
        O: IntoIterator,
        O::Item: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
            order_by: order_by.into_iter().map(Into::into).collect(),
            delete_mode: DeleteMode::default(),
            op_column: "op".to_string(),
            codes: OperationCodes::default(),
        }
    }

    pub fn with_delete_mode(mut self, mode: DeleteMode) -> Self {
        self.delete_mode = mode;
        self
    }

    pub fn with_op_column(mut self, column: impl Into<String>) -> Self {
        self.op_column = column.into();
        self
    }

    pub fn with_codes(mut self, codes: OperationCodes) -> Self {
        self.codes = codes;
        self
    }
}

/// Operation mix among the latest envelope of every key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CdcSummary {
    pub keys: usize,
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
    pub unrecognized: usize,
    pub rows_out: usize,
}

impl CdcSummary {
    fn tally(ops: &[Operation]) -> Self {
        let mut summary = CdcSummary {
            keys: ops.len(),
            ..Default::default()
        };
        for op in ops {
            match op {
                Operation::Insert => summary.inserts += 1,
                Operation::Update => summary.updates += 1,
                Operation::Delete => summary.deletes += 1,
                Operation::Unrecognized(_) => summary.unrecognized += 1,
            }
        }
        summary
    }
}

/// Resolves envelopes to one current-state row per key.
///
/// Only the latest envelope of a key counts; earlier envelopes are discarded
/// whatever their operation. Malformed codes never raise: they are dropped in
/// `ignore`/`hard_delete` mode and flagged as non-deleted in `tombstone` mode.
/// The operation column is removed from the output.
pub fn resolve_cdc<T: Table>(table: &T, options: &CdcOptions) -> Result<T, CurationError> {
    resolve_cdc_with_summary(table, options).map(|(resolved, _)| resolved)
}

pub fn resolve_cdc_with_summary<T: Table>(
    table: &T,
    options: &CdcOptions,
) -> Result<(T, CdcSummary), CurationError> {
    let keys: Vec<&str> = options.keys.iter().map(String::as_str).collect();
    let order_by: Vec<&str> = options.order_by.iter().map(String::as_str).collect();
    ensure_columns(&keys, "resolve_cdc", "key")?;
    ensure_columns(&order_by, "resolve_cdc", "order_by")?;
    table.require_columns(&[options.op_column.as_str()], "resolve_cdc")?;

    let latest = dedupe_to(table, &keys, &order_by, Pick::Latest)?;
    let op_idx = latest.require_columns(&[options.op_column.as_str()], "resolve_cdc")?[0];
    let ops: Vec<Operation> = (0..latest.num_rows())
        .map(|row| options.codes.classify(latest.value(row, op_idx)))
        .collect();
    let mut summary = CdcSummary::tally(&ops);

    if summary.unrecognized > 0 {
        let sample: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                Operation::Unrecognized(code) => Some(code.as_str()),
                _ => None,
            })
            .take(5)
            .collect();
        warn!(
            table = latest.name(),
            count = summary.unrecognized,
            ?sample,
            mode = %options.delete_mode,
            "Unrecognized operation codes in latest envelopes"
        );
    }

    let resolved = match options.delete_mode {
        DeleteMode::Ignore | DeleteMode::HardDelete => {
            latest.filter_rows(|row| ops[row].is_upsert())
        }
        DeleteMode::Tombstone => {
            let flags = ops.iter().map(|op| Value::Boolean(op.is_delete())).collect();
            latest.with_column(DELETED_COLUMN, flags)?
        }
    };
    let resolved = resolved.drop_column(&options.op_column);
    summary.rows_out = resolved.num_rows();

    debug!(
        table = resolved.name(),
        rows_in = table.num_rows(),
        keys = summary.keys,
        rows_out = summary.rows_out,
        deletes = summary.deletes,
        mode = %options.delete_mode,
        "Resolved CDC envelopes"
    );
    Ok((resolved, summary))
}
