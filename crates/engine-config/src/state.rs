use crate::error::ConfigError;
use engine_core::state::{StateStore, file_store::FileStateStore, sled_store::SledStateStore};
use std::{fmt, path::Path, str::FromStr, sync::Arc};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateBackend {
    /// One JSON file per watermark.
    #[default]
    File,
    /// Embedded sled database.
    Sled,
}

impl FromStr for StateBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "file" | "json" => Ok(StateBackend::File),
            "sled" => Ok(StateBackend::Sled),
            _ => Err(format!("Unknown state backend '{s}' (expected file or sled)")),
        }
    }
}

impl fmt::Display for StateBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StateBackend::File => "file",
            StateBackend::Sled => "sled",
        })
    }
}

/// Opens the watermark store rooted at `dir`.
pub fn open_store(backend: StateBackend, dir: &Path) -> Result<Arc<dyn StateStore>, ConfigError> {
    debug!(%backend, dir = %dir.display(), "Opening state store");
    let store: Arc<dyn StateStore> = match backend {
        StateBackend::File => Arc::new(FileStateStore::new(dir)),
        StateBackend::Sled => Arc::new(SledStateStore::open(dir)?),
    };
    Ok(store)
}
