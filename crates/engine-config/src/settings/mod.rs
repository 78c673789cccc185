use crate::{error::ConfigError, settings::validated::ValidatedConfig};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};
use tracing::info;

pub mod validated;
pub mod validator;

/// Curation document as written in YAML. Every enum-like field is kept as a
/// string here and checked by [`validator::ConfigValidator`] so that all
/// problems are reported at once.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CurationConfig {
    pub source: SourceSection,
    #[serde(default)]
    pub output: Option<OutputSection>,
    /// `current` (default) or `history`.
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<String>,
    #[serde(default)]
    pub cdc: CdcSection,
    #[serde(default)]
    pub history: HistorySection,
    #[serde(default)]
    pub watermark: Option<WatermarkSection>,
    #[serde(default)]
    pub late_data: Option<LateDataSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    pub path: String,
    /// Table name used in logs; defaults to the file stem.
    #[serde(default)]
    pub name: Option<String>,
    /// Column name → type name. Columns not listed are inferred per cell.
    #[serde(default)]
    pub column_types: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CdcSection {
    #[serde(default)]
    pub op_column: Option<String>,
    #[serde(default)]
    pub delete_mode: Option<String>,
    #[serde(default)]
    pub insert_code: Option<String>,
    #[serde(default)]
    pub update_code: Option<String>,
    #[serde(default)]
    pub delete_code: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistorySection {
    /// Defaults to the first `order_by` column.
    #[serde(default)]
    pub ts_column: Option<String>,
    #[serde(default)]
    pub effective_from: Option<String>,
    #[serde(default)]
    pub effective_to: Option<String>,
    #[serde(default)]
    pub is_current: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatermarkSection {
    pub system: String,
    pub entity: String,
    /// Timestamp column compared against the watermark; defaults to the
    /// first `order_by` column.
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub state_dir: Option<String>,
    /// `file` (default) or `sled`.
    #[serde(default)]
    pub backend: Option<String>,
    /// `local` (default), `destination` or `auto`.
    #[serde(default)]
    pub source: Option<String>,
    /// Destination path template, e.g. `silver/orders/{date}`.
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LateDataSection {
    pub policy: String,
    #[serde(default)]
    pub quarantine_path: Option<String>,
}

impl CurationConfig {
    pub fn from_yaml(source: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(source)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), "Loaded curation config");
        Self::from_yaml(&source)
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        validator::ConfigValidator::new(self).validate()
    }
}

/// Loads and validates a curation config in one step.
pub fn load_config(path: impl AsRef<Path>) -> Result<ValidatedConfig, ConfigError> {
    CurationConfig::load(path)?.validate()
}
