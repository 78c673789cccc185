use crate::{
    error::ConfigError,
    settings::{
        CurationConfig,
        validated::{SourceSettings, StateSettings, ValidatedConfig},
    },
    state::StateBackend,
};
use engine_processing::{
    curation::{
        cdc::{CdcOptions, DeleteMode, OperationCodes},
        history::HistoryOptions,
    },
    incremental::{late_data::LateDataPolicy, watermark::WatermarkSource},
    pipeline::{CurationMode, IncrementalSettings},
};
use model::core::data_type::DataType;
use std::{collections::BTreeMap, path::PathBuf, str::FromStr};
use tracing::{info, warn};

/// Checks a raw [`CurationConfig`], collecting every problem before failing.
pub struct ConfigValidator<'a> {
    config: &'a CurationConfig,
    errors: Vec<String>,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(config: &'a CurationConfig) -> Self {
        Self {
            config,
            errors: Vec::new(),
        }
    }

    pub fn validate(mut self) -> Result<ValidatedConfig, ConfigError> {
        let mut source = self.validate_source();
        self.validate_keys();
        let mode = self.validate_mode();
        self.pin_op_column_type(&mut source, &mode);
        let (incremental, state) = self.validate_watermark();
        let (late_policy, quarantine_path) = self.validate_late_data(incremental.is_some());

        if !self.errors.is_empty() {
            return Err(ConfigError::ValidationFailed(self.errors));
        }

        let incremental = incremental.map(|settings| settings.with_late_policy(late_policy));

        let validated = ValidatedConfig {
            source,
            output_path: self.config.output.as_ref().map(|o| PathBuf::from(&o.path)),
            mode,
            incremental,
            state,
            quarantine_path,
        };
        info!(
            source = %validated.source.path.display(),
            incremental = validated.is_incremental(),
            "Curation config validated"
        );
        Ok(validated)
    }

    fn validate_source(&mut self) -> SourceSettings {
        let section = &self.config.source;
        if section.path.trim().is_empty() {
            self.errors.push("source.path must not be empty".to_string());
        }

        let mut column_types = BTreeMap::new();
        for (column, type_name) in &section.column_types {
            match DataType::from_str(type_name) {
                Ok(data_type) => {
                    column_types.insert(column.clone(), data_type);
                }
                Err(err) => self.errors.push(format!("source.column_types.{column}: {err}")),
            }
        }

        let path = PathBuf::from(&section.path);
        let name = section.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "source".to_string())
        });

        SourceSettings {
            path,
            name,
            column_types,
        }
    }

    fn validate_keys(&mut self) {
        if self.config.keys.is_empty() {
            self.errors.push("keys must name at least one column".to_string());
        }
        if self.config.keys.iter().any(|k| k.trim().is_empty()) {
            self.errors.push("keys must not contain empty column names".to_string());
        }
        if self.config.order_by.iter().any(|c| c.trim().is_empty()) {
            self.errors.push("order_by must not contain empty column names".to_string());
        }
    }

    fn validate_mode(&mut self) -> CurationMode {
        let mode = self.config.mode.as_deref().unwrap_or("current");
        match mode.to_ascii_lowercase().as_str() {
            "current" | "scd1" => CurationMode::Current(self.validate_cdc()),
            "history" | "scd2" => CurationMode::History(self.validate_history()),
            other => {
                self.errors.push(format!(
                    "Unknown mode '{other}' (expected current or history)"
                ));
                CurationMode::Current(CdcOptions::new(
                    self.config.keys.clone(),
                    self.config.order_by.clone(),
                ))
            }
        }
    }

    fn validate_cdc(&mut self) -> CdcOptions {
        let section = &self.config.cdc;
        if self.config.order_by.is_empty() {
            self.errors
                .push("order_by must name at least one column in current mode".to_string());
        }

        let delete_mode = match section.delete_mode.as_deref() {
            Some(raw) => DeleteMode::from_str(raw).unwrap_or_else(|err| {
                self.errors.push(format!("cdc.delete_mode: {err}"));
                DeleteMode::default()
            }),
            None => DeleteMode::default(),
        };

        let defaults = OperationCodes::default();
        let codes = OperationCodes {
            insert: section.insert_code.clone().unwrap_or(defaults.insert),
            update: section.update_code.clone().unwrap_or(defaults.update),
            delete: section.delete_code.clone().unwrap_or(defaults.delete),
        };
        if codes.insert == codes.update || codes.insert == codes.delete || codes.update == codes.delete
        {
            self.errors
                .push("cdc insert, update and delete codes must be distinct".to_string());
        }

        let mut options = CdcOptions::new(self.config.keys.clone(), self.config.order_by.clone())
            .with_delete_mode(delete_mode)
            .with_codes(codes);
        if let Some(op_column) = &section.op_column {
            options = options.with_op_column(op_column.clone());
        }
        options
    }

    /// Operation codes are strings, so the op column is always read as text.
    fn pin_op_column_type(&mut self, source: &mut SourceSettings, mode: &CurationMode) {
        let CurationMode::Current(options) = mode else {
            return;
        };
        match source.column_types.get(&options.op_column) {
            None => {
                source
                    .column_types
                    .insert(options.op_column.clone(), DataType::String);
            }
            Some(DataType::String) => {}
            Some(other) => self.errors.push(format!(
                "source.column_types.{}: op column must be a string, not {}",
                options.op_column,
                other.name()
            )),
        }
    }

    fn validate_history(&mut self) -> HistoryOptions {
        let section = &self.config.history;
        let ts_column = section
            .ts_column
            .clone()
            .or_else(|| self.config.order_by.first().cloned());
        let Some(ts_column) = ts_column else {
            self.errors
                .push("history mode needs history.ts_column or an order_by column".to_string());
            return HistoryOptions::new(self.config.keys.clone(), "");
        };

        let defaults = HistoryOptions::new(self.config.keys.clone(), ts_column);
        let options = defaults.clone().with_column_names(
            section.effective_from.clone().unwrap_or(defaults.effective_from),
            section.effective_to.clone().unwrap_or(defaults.effective_to),
            section.is_current.clone().unwrap_or(defaults.is_current),
        );
        if options.effective_from == options.effective_to
            || options.effective_from == options.is_current
            || options.effective_to == options.is_current
        {
            self.errors
                .push("history column names must be distinct".to_string());
        }
        options
    }

    fn validate_watermark(&mut self) -> (Option<IncrementalSettings>, StateSettings) {
        let Some(section) = &self.config.watermark else {
            return (None, StateSettings::default());
        };

        if section.system.trim().is_empty() || section.entity.trim().is_empty() {
            self.errors
                .push("watermark.system and watermark.entity must not be empty".to_string());
        }

        let backend = match section.backend.as_deref() {
            Some(raw) => StateBackend::from_str(raw).unwrap_or_else(|err| {
                self.errors.push(format!("watermark.backend: {err}"));
                StateBackend::default()
            }),
            None => StateBackend::default(),
        };
        let source = match section.source.as_deref() {
            Some(raw) => WatermarkSource::from_str(raw).unwrap_or_else(|err| {
                self.errors.push(format!("watermark.source: {err}"));
                WatermarkSource::default()
            }),
            None => WatermarkSource::default(),
        };
        if source == WatermarkSource::Destination && section.target.is_none() {
            self.errors
                .push("watermark.source 'destination' requires watermark.target".to_string());
        }

        let column = section.column.clone().or_else(|| match &self.config.history.ts_column {
            Some(ts) => Some(ts.clone()),
            None => self.config.order_by.first().cloned(),
        });
        let Some(column) = column else {
            self.errors
                .push("watermark.column is required when order_by is empty".to_string());
            return (None, StateSettings::default());
        };

        let settings = IncrementalSettings::new(&section.system, &section.entity, &column)
            .with_source(source, section.target.clone());
        let state = StateSettings {
            backend,
            dir: section.state_dir.as_ref().map(PathBuf::from),
        };
        (Some(settings), state)
    }

    fn validate_late_data(&mut self, has_watermark: bool) -> (LateDataPolicy, Option<PathBuf>) {
        let Some(section) = &self.config.late_data else {
            return (LateDataPolicy::default(), None);
        };

        let policy = match LateDataPolicy::from_str(&section.policy) {
            Ok(policy) => policy,
            Err(err) => {
                self.errors.push(format!("late_data.policy: {err}"));
                return (LateDataPolicy::default(), None);
            }
        };
        if !has_watermark {
            self.errors
                .push("late_data requires a watermark section to compare against".to_string());
        }
        if policy == LateDataPolicy::Quarantine && section.quarantine_path.is_none() {
            warn!("late_data.policy is quarantine but no quarantine_path is set, late rows will be discarded");
        }
        if policy != LateDataPolicy::Quarantine && section.quarantine_path.is_some() {
            warn!(%policy, "late_data.quarantine_path is ignored for this policy");
        }
        (policy, section.quarantine_path.as_ref().map(PathBuf::from))
    }
}
