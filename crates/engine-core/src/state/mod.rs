use crate::{error::StateStoreError, state::models::Watermark};
use async_trait::async_trait;

pub mod file_store;
pub mod models;
pub mod sled_store;

/// Persistence for per-(system, entity) watermarks.
///
/// Stores never serialize concurrent writers to the same key; a save simply
/// overwrites whatever is there.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Unreadable or corrupt records are reported as absent, not as errors.
    async fn load_watermark(
        &self,
        system: &str,
        entity: &str,
    ) -> Result<Option<Watermark>, StateStoreError>;

    async fn save_watermark(&self, watermark: &Watermark) -> Result<(), StateStoreError>;

    /// Returns whether a record existed.
    async fn delete_watermark(&self, system: &str, entity: &str) -> Result<bool, StateStoreError>;

    /// All readable watermarks, sorted by system then entity.
    async fn list_watermarks(&self) -> Result<Vec<Watermark>, StateStoreError>;
}
