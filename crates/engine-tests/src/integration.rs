#[cfg(test)]
mod tests {
    use crate::utils::{CUSTOMERS_CDC_CSV, CUSTOMERS_CONFIG_YAML, strings, templated_config, write_file};
    use connectors::file::csv::{sink::CsvSink, source::CsvSource};
    use engine_config::{
        settings::{load_config, validated::ValidatedConfig},
        state::open_store,
    };
    use engine_processing::{
        curation::cdc::{CdcOptions, OperationCodes, resolve_cdc},
        pipeline::CurationReport,
    };
    use model::{
        core::value::Value,
        records::table::{MemTable, Table},
    };
    use std::path::Path;
    use tempfile::tempdir;
    use tracing_test::traced_test;

    const SECOND_BATCH_CSV: &str = "\
customer_id,op,updated_at,name,tier
1,U,2025-01-03T00:00:00Z,Ada Lovelace,gold
3,D,2025-01-05T09:00:00Z,Chen,bronze
";

    fn setup(dir: &Path, yaml: &str) -> ValidatedConfig {
        write_file(&dir.join("bronze/customers.csv"), CUSTOMERS_CDC_CSV);
        let config_path = dir.join("customers.yaml");
        write_file(&config_path, &templated_config(yaml, dir));
        load_config(&config_path).unwrap()
    }

    /// Reads the configured source, curates it and writes the output file.
    async fn run(config: &ValidatedConfig, dry_run: bool) -> (MemTable, CurationReport) {
        let table = CsvSource::new(&config.source.path)
            .with_column_types(config.source.column_types.clone())
            .read_named(&config.source.name)
            .unwrap();

        let state_dir = config.state.dir.clone().unwrap();
        let store = open_store(config.state.backend, &state_dir).unwrap();
        let out = config.curator(store, dry_run).run(&table).await.unwrap();

        if let Some(path) = &config.output_path {
            CsvSink::new(path).write(&out.table).unwrap();
        }
        (out.table, out.report)
    }

    fn quarantine_lines(dir: &Path) -> Vec<serde_json::Value> {
        match std::fs::read_to_string(dir.join("quarantine/customers.jsonl")) {
            Ok(contents) => contents
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    // Scenario: first run over an out-of-order bronze batch with a retried
    // envelope, a delete followed by re-insert and an unknown op code.
    // Expected Outcome:
    // - One row per customer with the latest attributes, none flagged deleted.
    // - The watermark lands on the newest `updated_at`.
    // - The silver CSV reads back with the same rows.
    #[traced_test]
    #[tokio::test]
    async fn tc01_first_run_builds_current_state() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), CUSTOMERS_CONFIG_YAML);

        let (silver, report) = run(&config, false).await;
        assert_eq!(strings(&silver, "customer_id"), vec!["1", "2", "3"]);
        assert_eq!(strings(&silver, "name"), vec!["Ada L.", "Brian R.", "Chen"]);
        assert_eq!(
            silver.column_values("_deleted").unwrap(),
            vec![Value::Boolean(false); 3]
        );
        assert!(!silver.has_column("op"));

        assert_eq!(report.rows_in, 8);
        assert_eq!(report.rows_out, 3);
        assert_eq!(report.previous_watermark, None);
        assert_eq!(report.new_watermark.as_deref(), Some("2025-01-04T08:00:00Z"));
        assert_eq!(report.cdc.as_ref().unwrap().unrecognized, 1);

        let written = CsvSource::new(config.output_path.as_ref().unwrap()).read().unwrap();
        assert_eq!(written.num_rows(), 3);
        assert_eq!(strings(&written, "tier"), vec!["gold", "platinum", "bronze"]);
        assert!(quarantine_lines(dir.path()).is_empty());
    }

    // Scenario: a second batch arrives with one backfilled update older than
    // the watermark and one fresh delete.
    // Expected Outcome:
    // - The backfill is quarantined with its watermark and reason.
    // - The delete becomes a tombstone and the watermark advances.
    #[traced_test]
    #[tokio::test]
    async fn tc02_second_run_quarantines_late_rows() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), CUSTOMERS_CONFIG_YAML);
        run(&config, false).await;

        write_file(&dir.path().join("bronze/customers.csv"), SECOND_BATCH_CSV);
        let (silver, report) = run(&config, false).await;

        assert_eq!(strings(&silver, "customer_id"), vec!["3"]);
        assert_eq!(silver.column_values("_deleted").unwrap(), vec![Value::Boolean(true)]);
        assert_eq!(report.late_data.as_ref().unwrap().late_rows, 1);
        assert_eq!(report.previous_watermark.as_deref(), Some("2025-01-04T08:00:00Z"));
        assert_eq!(report.new_watermark.as_deref(), Some("2025-01-05T09:00:00Z"));
        assert_eq!(report.metrics.rows_quarantined, 1);

        let lines = quarantine_lines(dir.path());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["reason"], "late_data");
        assert_eq!(lines[0]["watermark"], "2025-01-04T08:00:00Z");
        assert_eq!(lines[0]["row"]["customer_id"], 1);
        assert_eq!(lines[0]["row"]["name"], "Ada Lovelace");
    }

    // Scenario: the second batch is replayed as a dry run.
    // Expected Outcome: same curated rows, but neither the watermark nor the
    // quarantine file changes.
    #[traced_test]
    #[tokio::test]
    async fn tc03_dry_run_persists_nothing() {
        let dir = tempdir().unwrap();
        let config = setup(dir.path(), CUSTOMERS_CONFIG_YAML);
        run(&config, false).await;

        write_file(&dir.path().join("bronze/customers.csv"), SECOND_BATCH_CSV);
        let (silver, report) = run(&config, true).await;
        assert!(report.dry_run);
        assert_eq!(silver.num_rows(), 1);
        assert_eq!(report.new_watermark.as_deref(), Some("2025-01-05T09:00:00Z"));
        assert!(quarantine_lines(dir.path()).is_empty());

        let (_, replay) = run(&config, false).await;
        assert_eq!(replay.previous_watermark.as_deref(), Some("2025-01-04T08:00:00Z"));
    }

    // Scenario: the same bronze file curated into a version history.
    // Expected Outcome: every envelope becomes a version and each customer has
    // exactly one current row.
    #[traced_test]
    #[tokio::test]
    async fn tc04_history_mode_from_config() {
        let dir = tempdir().unwrap();
        let yaml = r#"
source:
  path: "{dir}/bronze/customers.csv"
  column_types:
    updated_at: timestamp
output:
  path: "{dir}/silver/customers_history.csv"
mode: history
keys: [customer_id]
history:
  ts_column: updated_at
  effective_from: valid_from
  effective_to: valid_to
"#;
        let config = setup(dir.path(), yaml);
        assert!(!config.is_incremental());

        let (history, report) = run_without_state(&config).await;
        assert_eq!(report.rows_out, 8);
        assert!(history.has_column("valid_from"));
        assert!(history.has_column("valid_to"));

        let current: Vec<Value> = history.column_values("is_current").unwrap();
        assert_eq!(current.iter().filter(|v| **v == Value::Boolean(true)).count(), 3);
    }

    async fn run_without_state(config: &ValidatedConfig) -> (MemTable, CurationReport) {
        let dir = tempdir().unwrap();
        let store = open_store(config.state.backend, dir.path()).unwrap();
        let table = CsvSource::new(&config.source.path)
            .with_column_types(config.source.column_types.clone())
            .read_named(&config.source.name)
            .unwrap();
        let out = config.curator(store, false).run(&table).await.unwrap();
        (out.table, out.report)
    }
    // Scenario: postal-code keys with leading zeros and numeric operation
    // codes, neither given a column type in the config.
    // Expected Outcome:
    // - `001` and `1` stay distinct keys and `042` is deleted.
    // - The silver file keeps the keys exactly as they arrived.
    #[traced_test]
    #[tokio::test]
    async fn tc05_untyped_text_keys_and_numeric_codes() {
        let dir = tempdir().unwrap();
        let yaml = r#"
source:
  path: "{dir}/bronze/customers.csv"
output:
  path: "{dir}/silver/zips.csv"
keys: [zip]
order_by: [ts]
cdc:
  insert_code: "1"
  update_code: "2"
  delete_code: "3"
"#;
        let config = setup(dir.path(), yaml);
        write_file(
            &dir.path().join("bronze/customers.csv"),
            "zip,op,ts,name\n001,1,1,a\n1,1,2,b\n1,2,3,b2\n042,1,1,x\n042,3,4,x\n",
        );

        let (silver, report) = run_without_state(&config).await;
        assert_eq!(strings(&silver, "zip"), vec!["001", "1"]);
        assert_eq!(strings(&silver, "name"), vec!["a", "b2"]);
        assert_eq!(report.cdc.as_ref().unwrap().unrecognized, 0);

        let path = config.output_path.as_ref().unwrap();
        CsvSink::new(path).write(&silver).unwrap();
        let written = CsvSource::new(path).read().unwrap();
        assert_eq!(
            written.column_values("zip").unwrap(),
            vec![Value::from("001"), Value::from("1")]
        );
    }

    // Scenario: numeric operation codes read straight from CSV without a config.
    // Expected Outcome: the codes are matched on their text, not dropped.
    #[test]
    fn tc06_numeric_codes_from_untyped_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        write_file(&path, "id,op,ts\n1,1,1\n2,2,1\n");

        let table = CsvSource::new(&path).read().unwrap();
        let options = CdcOptions::new(["id"], ["ts"]).with_codes(OperationCodes {
            insert: "1".into(),
            update: "2".into(),
            delete: "3".into(),
        });
        let out = resolve_cdc(&table, &options).unwrap();
        assert_eq!(out.num_rows(), 2);
    }
}
