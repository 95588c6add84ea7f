//! Per-session asset cache.

use std::collections::HashMap;
use std::sync::Arc;

use compass_domain::{Asset, AssetKey};
use tokio::sync::RwLock;

use crate::infrastructure::ports::{FileManager, FileManagerError};

/// Assets resolved through the FileManager, kept until invalidated.
///
/// Misses are not cached, so an asset saved later is picked up on the next
/// lookup.
pub struct AssetCache {
    file_manager: Arc<dyn FileManager>,
    entries: RwLock<HashMap<AssetKey, Asset>>,
}

impl AssetCache {
    pub fn new(file_manager: Arc<dyn FileManager>) -> Self {
        Self {
            file_manager,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &AssetKey) -> Result<Option<Asset>, FileManagerError> {
        if let Some(asset) = self.entries.read().await.get(key) {
            return Ok(Some(asset.clone()));
        }

        let asset = self.file_manager.get_asset(key).await?;
        match &asset {
            Some(asset) => {
                self.entries.write().await.insert(key.clone(), asset.clone());
            }
            None => tracing::debug!(path = %key.path(), "Asset not found"),
        }
        Ok(asset)
    }

    pub async fn invalidate(&self, key: &AssetKey) -> Option<Asset> {
        self.entries.write().await.remove(key)
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
