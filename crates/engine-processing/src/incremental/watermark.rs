use crate::error::CurationError;
use chrono::Utc;
use engine_core::state::{StateStore, models::Watermark};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tracing::{debug, info, warn};

const METADATA_FILE: &str = "_metadata.json";

/// Where the previous high-water value is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkSource {
    /// Persisted local record only.
    #[default]
    Local,
    /// Metadata of the newest partition in the write destination.
    Destination,
    /// Destination first, local when the destination yields nothing.
    Auto,
}

impl FromStr for WatermarkSource {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(WatermarkSource::Local),
            "destination" => Ok(WatermarkSource::Destination),
            "auto" => Ok(WatermarkSource::Auto),
            _ => Err(CurationError::UnsupportedWatermarkSource(s.to_string())),
        }
    }
}

impl fmt::Display for WatermarkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WatermarkSource::Local => "local",
            WatermarkSource::Destination => "destination",
            WatermarkSource::Auto => "auto",
        })
    }
}

/// Reads and advances watermarks on top of a [`StateStore`].
#[derive(Clone)]
pub struct WatermarkManager {
    store: Arc<dyn StateStore>,
}

impl WatermarkManager {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub async fn get_watermark(
        &self,
        system: &str,
        entity: &str,
    ) -> Result<Option<Watermark>, CurationError> {
        Ok(self.store.load_watermark(system, entity).await?)
    }

    /// Persists `value` with `updated_at` set to now. Overwrites unconditionally.
    pub async fn save_watermark(
        &self,
        system: &str,
        entity: &str,
        value: &str,
    ) -> Result<Watermark, CurationError> {
        let watermark = Watermark::new(system, entity, value, Utc::now());
        self.store.save_watermark(&watermark).await?;
        info!(system, entity, value, "Saved watermark");
        Ok(watermark)
    }

    pub async fn delete_watermark(&self, system: &str, entity: &str) -> Result<bool, CurationError> {
        let removed = self.store.delete_watermark(system, entity).await?;
        if removed {
            info!(system, entity, "Deleted watermark");
        }
        Ok(removed)
    }

    pub async fn list_watermarks(&self) -> Result<Vec<Watermark>, CurationError> {
        Ok(self.store.list_watermarks().await?)
    }

    /// Hours since the watermark was last saved, `None` when there is no
    /// record or its timestamp cannot be read.
    pub async fn get_watermark_age(
        &self,
        system: &str,
        entity: &str,
    ) -> Result<Option<f64>, CurationError> {
        let watermark = self.get_watermark(system, entity).await?;
        Ok(watermark.and_then(|wm| wm.age_hours(Utc::now())))
    }

    /// Previous watermark value according to `source`.
    ///
    /// Destination lookups never fail the run: an unreadable destination is
    /// logged and treated as having no watermark.
    pub async fn resolve_watermark(
        &self,
        system: &str,
        entity: &str,
        source: WatermarkSource,
        target_path: Option<&str>,
    ) -> Result<Option<String>, CurationError> {
        let resolved = match source {
            WatermarkSource::Local => self.local_value(system, entity).await?,
            WatermarkSource::Destination => lookup_destination(target_path).await,
            WatermarkSource::Auto => match lookup_destination(target_path).await {
                Some(value) => Some(value),
                None => self.local_value(system, entity).await?,
            },
        };

        debug!(system, entity, %source, watermark = ?resolved, "Resolved watermark");
        Ok(resolved)
    }

    async fn local_value(&self, system: &str, entity: &str) -> Result<Option<String>, CurationError> {
        let watermark = self.get_watermark(system, entity).await?;
        Ok(watermark.map(|wm| wm.last_value))
    }
}

async fn lookup_destination(target_path: Option<&str>) -> Option<String> {
    let template = target_path?;
    match destination_watermark(template).await {
        Ok(value) => value,
        Err(err) => {
            warn!(target = template, error = %err, "Destination watermark unavailable");
            None
        }
    }
}

/// Directory part of a target template before its first `{placeholder}` segment.
pub fn template_base(template: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for segment in Path::new(template).components() {
        if segment.as_os_str().to_string_lossy().contains('{') {
            break;
        }
        base.push(segment);
    }
    base
}

/// Reads `last_watermark` from the newest partition under the template base.
///
/// The newest partition is the lexicographically greatest subdirectory. A
/// missing base directory, no partitions or a newest partition without a
/// metadata file yields `Ok(None)`; older partitions are never consulted. A
/// metadata file that cannot be read or parsed is an error.
pub async fn destination_watermark(template: &str) -> Result<Option<String>, CurationError> {
    let base = template_base(template);
    let destination_err = |path: &Path, reason: String| CurationError::Destination {
        path: path.display().to_string(),
        reason,
    };

    let mut entries = match tokio::fs::read_dir(&base).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(destination_err(&base, err.to_string())),
    };

    let mut newest: Option<PathBuf> = None;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| destination_err(&base, e.to_string()))?
    {
        let is_dir = entry
            .file_type()
            .await
            .map_err(|e| destination_err(&entry.path(), e.to_string()))?
            .is_dir();
        if !is_dir {
            continue;
        }
        let path = entry.path();
        if newest.as_ref().is_none_or(|current| path.file_name() > current.file_name()) {
            newest = Some(path);
        }
    }

    let Some(partition) = newest else {
        return Ok(None);
    };
    let metadata_path = partition.join(METADATA_FILE);
    let has_metadata = tokio::fs::try_exists(&metadata_path)
        .await
        .map_err(|e| destination_err(&metadata_path, e.to_string()))?;
    if !has_metadata {
        debug!(partition = %partition.display(), "Newest partition has no metadata");
        return Ok(None);
    }
    let bytes = tokio::fs::read(&metadata_path)
        .await
        .map_err(|e| destination_err(&metadata_path, e.to_string()))?;
    let metadata: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| destination_err(&metadata_path, e.to_string()))?;

    let value = metadata
        .get("extra")
        .and_then(|extra| extra.get("last_watermark"))
        .or_else(|| metadata.get("last_watermark"))
        .and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });

    debug!(partition = %partition.display(), watermark = ?value, "Read destination watermark");
    Ok(value)
}
