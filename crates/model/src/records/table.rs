use crate::{
    core::value::Value,
    error::TableError,
    records::row::{FieldValue, RowData},
};
use serde::{Deserialize, Serialize};
use std::{
    cmp::Ordering,
    collections::{HashMap, HashSet},
};

/// Tabular dataset the curation operators run against.
///
/// Implementors supply storage primitives; grouping and windowed ordering are
/// provided on top of them so every backend shares the same tie-break rules.
pub trait Table: Clone + Sized {
    fn name(&self) -> &str;

    fn column_names(&self) -> &[String];

    fn num_rows(&self) -> usize;

    /// Value at `row` for the column at position `column`.
    fn value(&self, row: usize, column: usize) -> &Value;

    /// Physical selection of rows, in the order given.
    fn take(&self, indices: &[usize]) -> Self;

    /// Replaces the column if it exists, otherwise appends it.
    fn with_column(self, name: &str, values: Vec<Value>) -> Result<Self, TableError>;

    /// Dropping an absent column is a no-op.
    fn drop_column(self, name: &str) -> Self;

    /// Vertical concatenation. Every input must carry the same column set.
    fn concat(tables: Vec<Self>) -> Result<Self, TableError>;

    fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    fn column_index(&self, name: &str) -> Option<usize> {
        self.column_names().iter().position(|c| c == name)
    }

    fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Resolves column positions, failing on the first missing column.
    fn require_columns(&self, names: &[&str], operation: &str) -> Result<Vec<usize>, TableError> {
        names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| TableError::MissingColumn {
                        table: self.name().to_string(),
                        column: name.to_string(),
                        operation: operation.to_string(),
                    })
            })
            .collect()
    }

    fn column_values(&self, name: &str) -> Result<Vec<Value>, TableError> {
        let idx = self.require_columns(&[name], "column_values")?[0];
        Ok((0..self.num_rows())
            .map(|row| self.value(row, idx).clone())
            .collect())
    }

    fn row_data(&self, row: usize) -> RowData {
        RowData::new(
            self.column_names()
                .iter()
                .enumerate()
                .map(|(idx, name)| FieldValue::new(name.clone(), self.value(row, idx).clone()))
                .collect(),
        )
    }

    /// Row indices grouped by natural key.
    ///
    /// Groups appear in order of their first row; rows inside a group keep
    /// their physical order. NULL is an ordinary key component and composite
    /// keys only match when every component matches.
    fn partition_by(&self, keys: &[&str]) -> Result<Vec<Vec<usize>>, TableError> {
        let key_idx = self.require_columns(keys, "partition_by")?;
        let mut groups: HashMap<Vec<&Value>, usize> = HashMap::new();
        let mut partitions: Vec<Vec<usize>> = Vec::new();

        for row in 0..self.num_rows() {
            let key: Vec<&Value> = key_idx.iter().map(|&c| self.value(row, c)).collect();
            let slot = *groups.entry(key).or_insert_with(|| {
                partitions.push(Vec::new());
                partitions.len() - 1
            });
            partitions[slot].push(row);
        }

        Ok(partitions)
    }

    /// Ascending comparison of two rows over `order_idx`, then by physical position.
    ///
    /// The positional component makes the order total: under equal ordering
    /// values the later row sorts after the earlier one.
    fn compare_rows(&self, a: usize, b: usize, order_idx: &[usize]) -> Ordering {
        order_idx
            .iter()
            .map(|&c| self.value(a, c).total_cmp(self.value(b, c)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    }

    fn sort_rows(&self, rows: &mut [usize], order_idx: &[usize], descending: bool) {
        rows.sort_by(|&a, &b| {
            let ord = self.compare_rows(a, b, order_idx);
            if descending { ord.reverse() } else { ord }
        });
    }

    fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize) -> bool,
    {
        let indices: Vec<usize> = (0..self.num_rows()).filter(|&row| keep(row)).collect();
        self.take(&indices)
    }
}

/// In-memory table backed by row records.
///
/// Every row carries exactly the table's columns, in column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<RowData>,
}

impl MemTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Result<Self, TableError> {
        let name = name.into();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(TableError::DuplicateColumn {
                    table: name,
                    column: column.clone(),
                });
            }
        }

        Ok(MemTable {
            name,
            columns,
            rows: Vec::new(),
        })
    }

    /// Builds a table with explicit columns; fields a row omits are NULL.
    pub fn with_columns(
        name: impl Into<String>,
        columns: Vec<String>,
        rows: Vec<RowData>,
    ) -> Result<Self, TableError> {
        let mut table = MemTable::new(name, columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Builds a table whose columns are the union of the rows' fields, in
    /// order of first appearance.
    pub fn from_rows(name: impl Into<String>, rows: Vec<RowData>) -> Result<Self, TableError> {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for field in row.names() {
                if !columns.iter().any(|c| c == field) {
                    columns.push(field.to_string());
                }
            }
        }
        MemTable::with_columns(name, columns, rows)
    }

    pub fn push_row(&mut self, row: RowData) -> Result<(), TableError> {
        if let Some(unknown) = row.names().find(|f| !self.columns.iter().any(|c| c == f)) {
            return Err(TableError::UnknownColumn {
                table: self.name.clone(),
                column: unknown.to_string(),
            });
        }

        let aligned = self
            .columns
            .iter()
            .map(|column| FieldValue::new(column.clone(), row.get_value(column)))
            .collect();
        self.rows.push(RowData::new(aligned));
        Ok(())
    }

    pub fn rows(&self) -> &[RowData] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<RowData> {
        self.rows
    }

    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Same rows reordered to `columns`. Used to line up inputs for concat.
    fn reorder(self, columns: &[String]) -> MemTable {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                RowData::new(
                    columns
                        .iter()
                        .map(|c| FieldValue::new(c.clone(), row.get_value(c)))
                        .collect(),
                )
            })
            .collect();

        MemTable {
            name: self.name,
            columns: columns.to_vec(),
            rows,
        }
    }
}

impl Table for MemTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn num_rows(&self) -> usize {
        self.rows.len()
    }

    fn value(&self, row: usize, column: usize) -> &Value {
        &self.rows[row].field_values[column].value
    }

    fn take(&self, indices: &[usize]) -> Self {
        MemTable {
            name: self.name.clone(),
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    fn with_column(mut self, name: &str, values: Vec<Value>) -> Result<Self, TableError> {
        if values.len() != self.rows.len() {
            return Err(TableError::LengthMismatch {
                column: name.to_string(),
                expected: self.rows.len(),
                actual: values.len(),
            });
        }

        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.field_values[idx].value = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.field_values.push(FieldValue::new(name, value));
                }
            }
        }
        Ok(self)
    }

    fn drop_column(mut self, name: &str) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in self.rows.iter_mut() {
                row.field_values.remove(idx);
            }
        }
        self
    }

    fn concat(tables: Vec<Self>) -> Result<Self, TableError> {
        let mut iter = tables.into_iter();
        let Some(mut combined) = iter.next() else {
            return Err(TableError::EmptyConcat);
        };

        let expected: HashSet<&String> = combined.columns.iter().collect();
        let columns = combined.columns.clone();
        for table in iter {
            let found: HashSet<&String> = table.columns.iter().collect();
            if found != expected {
                return Err(TableError::SchemaMismatch {
                    expected: columns.clone(),
                    found: table.columns.clone(),
                });
            }
            let aligned = if table.columns == columns {
                table
            } else {
                table.reorder(&columns)
            };
            combined.rows.extend(aligned.rows);
        }

        Ok(combined)
    }
}
