use crate::{
    error::StateStoreError,
    state::{StateStore, models::Watermark},
};
use async_trait::async_trait;
use std::path::Path;
use tracing::warn;

const WATERMARK_PREFIX: &str = "wm:";

/// Embedded key-value backend for watermarks.
pub struct SledStateStore {
    db: sled::Db,
}

impl SledStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Helper to generate consistent keys for watermarks
    #[inline]
    fn wm_key(system: &str, entity: &str) -> String {
        format!("{WATERMARK_PREFIX}{system}:{entity}")
    }

    fn decode(key: &[u8], bytes: &[u8]) -> Option<Watermark> {
        match bincode::deserialize::<Watermark>(bytes) {
            Ok(wm) => Some(wm),
            Err(err) => {
                warn!(
                    key = %String::from_utf8_lossy(key),
                    error = %err,
                    "Corrupt watermark record, treating as absent"
                );
                None
            }
        }
    }
}

#[async_trait]
impl StateStore for SledStateStore {
    async fn load_watermark(
        &self,
        system: &str,
        entity: &str,
    ) -> Result<Option<Watermark>, StateStoreError> {
        let key = Self::wm_key(system, entity);
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Self::decode(key.as_bytes(), &bytes)),
            None => Ok(None),
        }
    }

    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StateStoreError> {
        let key = Self::wm_key(&watermark.system, &watermark.entity);
        let value = bincode::serialize(watermark)
            .map_err(|e| StateStoreError::Serialization(e.to_string()))?;

        self.db.insert(key, value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn delete_watermark(&self, system: &str, entity: &str) -> Result<bool, StateStoreError> {
        let removed = self.db.remove(Self::wm_key(system, entity))?;
        Ok(removed.is_some())
    }

    async fn list_watermarks(&self) -> Result<Vec<Watermark>, StateStoreError> {
        let mut watermarks = Vec::new();

        // Sled iterators handle errors internally
        for item in self.db.scan_prefix(WATERMARK_PREFIX) {
            let (key, value) = item?;
            if let Some(wm) = Self::decode(&key, &value) {
                watermarks.push(wm);
            }
        }

        watermarks.sort_by(|a, b| (&a.system, &a.entity).cmp(&(&b.system, &b.entity)));
        Ok(watermarks)
    }
}
