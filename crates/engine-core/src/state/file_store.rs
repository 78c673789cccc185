use crate::{
    error::StateStoreError,
    state::{StateStore, models::Watermark},
};
use async_trait::async_trait;
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

const FILE_SUFFIX: &str = "_watermark.json";

/// One JSON document per watermark: `{state_dir}/{system}_{entity}_watermark.json`.
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[inline]
    fn path_for(&self, system: &str, entity: &str) -> PathBuf {
        self.dir.join(format!("{system}_{entity}{FILE_SUFFIX}"))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StateStoreError {
        StateStoreError::Io {
            path: path.display().to_string(),
            source,
        }
    }

    async fn read_file(path: &Path) -> Option<Watermark> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Watermark file unreadable, treating as absent");
                return None;
            }
        };

        match serde_json::from_slice::<Watermark>(&bytes) {
            Ok(wm) => Some(wm),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Corrupt watermark file, treating as absent");
                None
            }
        }
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load_watermark(
        &self,
        system: &str,
        entity: &str,
    ) -> Result<Option<Watermark>, StateStoreError> {
        Ok(Self::read_file(&self.path_for(system, entity)).await)
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StateStoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Self::io_error(&self.dir, e))?;

        let path = self.path_for(&watermark.system, &watermark.entity);
        let json = serde_json::to_vec_pretty(watermark)
            .map_err(|e| StateStoreError::Serialization(e.to_string()))?;

        // Write-then-rename so readers never observe a half-written file.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| Self::io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| Self::io_error(&path, e))?;

        debug!(
            system = %watermark.system,
            entity = %watermark.entity,
            value = %watermark.last_value,
            "Saved watermark"
        );
        Ok(())
    }

    async fn delete_watermark(&self, system: &str, entity: &str) -> Result<bool, StateStoreError> {
        let path = self.path_for(system, entity);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(Self::io_error(&path, err)),
        }
    }

    async fn list_watermarks(&self) -> Result<Vec<Watermark>, StateStoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(Self::io_error(&self.dir, err)),
        };

        let mut watermarks = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_error(&self.dir, e))?
        {
            let path = entry.path();
            let is_watermark = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(FILE_SUFFIX));
            if !is_watermark {
                continue;
            }
            if let Some(wm) = Self::read_file(&path).await {
                watermarks.push(wm);
            }
        }

        watermarks.sort_by(|a, b| (&a.system, &a.entity).cmp(&(&b.system, &b.entity)));
        Ok(watermarks)
    }
}
