use crate::state::StateBackend;
use engine_core::state::StateStore;
use engine_processing::{
    incremental::{quarantine::QuarantineWriter, watermark::WatermarkManager},
    pipeline::{CurationMode, Curator, IncrementalSettings},
};
use model::core::data_type::DataType;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

/// Immutable, validated configuration for one curation run.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub source: SourceSettings,
    pub output_path: Option<PathBuf>,
    pub mode: CurationMode,
    /// Present when a `watermark` section is configured.
    pub incremental: Option<IncrementalSettings>,
    pub state: StateSettings,
    pub quarantine_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceSettings {
    pub path: PathBuf,
    pub name: String,
    pub column_types: BTreeMap<String, DataType>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateSettings {
    pub backend: StateBackend,
    /// `None` lets the caller pick its default location.
    pub dir: Option<PathBuf>,
}

impl ValidatedConfig {
    pub fn is_incremental(&self) -> bool {
        self.incremental.is_some()
    }

    /// Builds the curator for this config. `store` is only consulted for
    /// incremental runs.
    pub fn curator(&self, store: Arc<dyn StateStore>, dry_run: bool) -> Curator {
        let mut curator = Curator::new(self.mode.clone()).with_dry_run(dry_run);

        if let Some(settings) = &self.incremental {
            curator = curator.with_incremental(WatermarkManager::new(store), settings.clone());
            if let Some(path) = &self.quarantine_path {
                curator = curator.with_quarantine(QuarantineWriter::new(
                    path,
                    &settings.system,
                    &settings.entity,
                ));
            }
        }
        curator
    }
}
