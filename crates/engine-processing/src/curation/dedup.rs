//! Windowed row selection by natural key.
//!
//! Every selection here orders rows inside a key by the `order_by` columns and
//! then by physical position, so exact ties resolve the same way for the same
//! input order: `Latest` keeps the last occurrence of the maximal value and
//! `Earliest` the first occurrence of the minimal value. Callers that need the
//! result to be stable across differently ordered inputs must put a fully
//! ordering tiebreaker (e.g. an ingestion sequence) into `order_by`.

use crate::error::CurationError;
use model::{core::value::Value, records::table::Table};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pick {
    Latest,
    Earliest,
}

pub(crate) fn ensure_columns(
    columns: &[&str],
    operation: &str,
    what: &str,
) -> Result<(), CurationError> {
    if columns.is_empty() {
        return Err(CurationError::NoColumns {
            operation: operation.to_string(),
            what: what.to_string(),
        });
    }
    Ok(())
}

/// Keeps one row per key. Output rows follow the first appearance of each key
/// and carry exactly the input columns.
pub fn dedupe_to<T: Table>(
    table: &T,
    keys: &[&str],
    order_by: &[&str],
    pick: Pick,
) -> Result<T, CurationError> {
    ensure_columns(keys, "dedupe_to", "key")?;
    ensure_columns(order_by, "dedupe_to", "order_by")?;
    let order_idx = table.require_columns(order_by, "dedupe_to")?;
    let partitions = table.partition_by(keys)?;

    let winners: Vec<usize> = partitions
        .into_iter()
        .filter_map(|rows| {
            let compare = |a: &usize, b: &usize| table.compare_rows(*a, *b, &order_idx);
            match pick {
                Pick::Latest => rows.into_iter().max_by(compare),
                Pick::Earliest => rows.into_iter().min_by(compare),
            }
        })
        .collect();

    debug!(
        table = table.name(),
        rows_in = table.num_rows(),
        rows_out = winners.len(),
        ?pick,
        "Deduplicated by key"
    );
    Ok(table.take(&winners))
}

/// Drops rows that repeat an earlier row on every column (NULL equals NULL).
pub fn dedupe_exact<T: Table>(table: &T) -> T {
    let width = table.column_names().len();
    let mut seen: HashSet<Vec<&Value>> = HashSet::with_capacity(table.num_rows());

    table.filter_rows(|row| {
        let full: Vec<&Value> = (0..width).map(|c| table.value(row, c)).collect();
        seen.insert(full)
    })
}

/// Appends a 0-based row-number rank per key. Ties get distinct sequential
/// ranks; rows keep their physical order.
pub fn rank_by_keys<T: Table>(
    table: &T,
    keys: &[&str],
    order_by: &[&str],
    descending: bool,
    rank_column: &str,
) -> Result<T, CurationError> {
    let ranks = row_numbers(table, keys, order_by, descending, "rank_by_keys")?;
    let values = ranks.into_iter().map(|r| Value::Int(r as i64)).collect();
    Ok(table.clone().with_column(rank_column, values)?)
}

/// Rows whose per-key rank is below `n`, in physical order, without a rank column.
pub fn top_n_by_keys<T: Table>(
    table: &T,
    keys: &[&str],
    order_by: &[&str],
    descending: bool,
    n: usize,
) -> Result<T, CurationError> {
    let ranks = row_numbers(table, keys, order_by, descending, "top_n_by_keys")?;
    Ok(table.filter_rows(|row| ranks[row] < n))
}

fn row_numbers<T: Table>(
    table: &T,
    keys: &[&str],
    order_by: &[&str],
    descending: bool,
    operation: &str,
) -> Result<Vec<usize>, CurationError> {
    ensure_columns(keys, operation, "key")?;
    ensure_columns(order_by, operation, "order_by")?;
    let order_idx = table.require_columns(order_by, operation)?;

    let mut ranks = vec![0usize; table.num_rows()];
    for mut rows in table.partition_by(keys)? {
        table.sort_rows(&mut rows, &order_idx, descending);
        for (rank, row) in rows.into_iter().enumerate() {
            ranks[row] = rank;
        }
    }
    Ok(ranks)
}

/// Writes `target` = `primary` where non-null, else the first non-null
/// fallback in declaration order.
///
/// Fallback columns missing from the table are skipped. Empty strings are
/// values, not NULLs, and are never replaced.
pub fn coalesce_columns<T: Table>(
    table: &T,
    target: &str,
    primary: &str,
    fallbacks: &[&str],
) -> Result<T, CurationError> {
    let primary_idx = table.require_columns(&[primary], "coalesce_columns")?[0];
    let fallback_idx: Vec<usize> = fallbacks
        .iter()
        .filter_map(|name| table.column_index(name))
        .collect();

    let values = (0..table.num_rows())
        .map(|row| {
            std::iter::once(primary_idx)
                .chain(fallback_idx.iter().copied())
                .map(|c| table.value(row, c))
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or(Value::Null)
        })
        .collect();

    Ok(table.clone().with_column(target, values)?)
}

/// Concatenates every input and keeps the latest row per key.
pub fn union_dedupe<T: Table>(
    tables: Vec<T>,
    keys: &[&str],
    order_by: &[&str],
) -> Result<T, CurationError> {
    if tables.is_empty() {
        return Err(CurationError::EmptyInput {
            operation: "union_dedupe".to_string(),
        });
    }
    let combined = T::concat(tables)?;
    dedupe_to(&combined, keys, order_by, Pick::Latest)
}
