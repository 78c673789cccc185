#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use engine_core::state::{StateStore, file_store::FileStateStore};
use engine_processing::incremental::watermark::WatermarkManager;
use model::{
    core::value::Value,
    records::{
        row::RowData,
        table::{MemTable, Table},
    },
};
use std::{collections::HashMap, path::Path, sync::Arc};

/// Bronze CDC batch for the `customers` entity, deliberately out of order,
/// with a retried envelope and a resurrected key.
pub const CUSTOMERS_CDC_CSV: &str = "\
customer_id,op,updated_at,name,tier
1,I,2025-01-01T09:00:00Z,Ada,gold
2,I,2025-01-01T09:05:00Z,Brian,silver
1,U,2025-01-02T10:00:00Z,Ada L.,gold
3,I,2025-01-02T11:00:00Z,Chen,bronze
2,D,2025-01-03T08:00:00Z,Brian,silver
1,U,2025-01-02T10:00:00Z,Ada L.,gold
3,X,2025-01-03T12:00:00Z,Chen,bronze
2,I,2025-01-04T08:00:00Z,Brian R.,platinum
";

/// Curation config template; `{dir}` is replaced with a temp directory.
pub const CUSTOMERS_CONFIG_YAML: &str = r#"
source:
  path: "{dir}/bronze/customers.csv"
  column_types:
    customer_id: int
    updated_at: timestamp
output:
  path: "{dir}/silver/customers.csv"
mode: current
keys: [customer_id]
order_by: [updated_at]
cdc:
  delete_mode: tombstone
watermark:
  system: crm
  entity: customers
  state_dir: "{dir}/state"
late_data:
  policy: quarantine
  quarantine_path: "{dir}/quarantine/customers.jsonl"
"#;

pub fn ts(day: u32, hour: u32) -> Value {
    Value::Timestamp(utc(day, hour))
}

pub fn utc(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, day, hour, 0, 0).unwrap()
}

/// CDC envelope keyed by `id`.
pub fn envelope(id: impl Into<Value>, op: impl Into<Value>, ts: impl Into<Value>, v: &str) -> RowData {
    RowData::from_pairs([
        ("id", id.into()),
        ("op", op.into()),
        ("ts", ts.into()),
        ("v", Value::from(v)),
    ])
}

pub fn table(rows: Vec<RowData>) -> MemTable {
    MemTable::from_rows("bronze", rows).unwrap()
}

pub fn file_manager(dir: &Path) -> WatermarkManager {
    let store: Arc<dyn StateStore> = Arc::new(FileStateStore::new(dir));
    WatermarkManager::new(store)
}

/// Rows keyed by the rendered value of `key`, for order-insensitive comparisons.
pub fn rows_by_key<T: Table>(table: &T, key: &str) -> HashMap<String, RowData> {
    let idx = table.column_index(key).unwrap();
    (0..table.num_rows())
        .map(|row| (table.value(row, idx).to_string(), table.row_data(row)))
        .collect()
}

pub fn values<T: Table>(table: &T, column: &str) -> Vec<Value> {
    table.column_values(column).unwrap()
}

pub fn strings<T: Table>(table: &T, column: &str) -> Vec<String> {
    values(table, column)
        .into_iter()
        .map(|v| v.to_string())
        .collect()
}

/// Same rows in a different physical order (reversed).
pub fn reversed(table: &MemTable) -> MemTable {
    let order: Vec<usize> = (0..table.num_rows()).rev().collect();
    table.take(&order)
}

pub fn write_file(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

pub fn templated_config(template: &str, dir: &Path) -> String {
    template.replace("{dir}", &dir.display().to_string())
}
