//! Load and save [`SiteConfig`] through the key-value store.
//!
//! Each field lives under its own key so a partial update only touches
//! the keys it changes.

use std::sync::Arc;
use tracing::debug;

use super::{keys, read_json, write_json, KeyValueStore, SiteConfig, SiteConfigPatch};
use crate::error::StoreError;

#[derive(Clone)]
pub struct SiteConfigRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SiteConfigRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Current settings; unset keys take their defaults.
    pub async fn load(&self) -> Result<SiteConfig, StoreError> {
        let defaults = SiteConfig::default();
        let store = self.store.as_ref();
        Ok(SiteConfig {
            community_enabled: read_json(store, keys::COMMUNITY_ENABLED)
                .await?
                .unwrap_or(defaults.community_enabled),
            maintenance_mode: read_json(store, keys::MAINTENANCE_MODE)
                .await?
                .unwrap_or(defaults.maintenance_mode),
            announcement: read_json(store, keys::ANNOUNCEMENT)
                .await?
                .unwrap_or(defaults.announcement),
        })
    }

    /// Merge `patch` into the stored settings and persist the touched keys.
    pub async fn update(&self, patch: &SiteConfigPatch) -> Result<SiteConfig, StoreError> {
        let mut config = self.load().await?;
        patch.apply(&mut config);

        let store = self.store.as_ref();
        if let Some(enabled) = patch.community_enabled {
            write_json(store, keys::COMMUNITY_ENABLED, &enabled).await?;
        }
        if let Some(maintenance) = patch.maintenance_mode {
            write_json(store, keys::MAINTENANCE_MODE, &maintenance).await?;
        }
        if let Some(announcement) = &patch.announcement {
            write_json(store, keys::ANNOUNCEMENT, announcement).await?;
        }

        debug!(?config, "Site configuration saved");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_load_defaults_when_unset() {
        let repo = SiteConfigRepository::new(Arc::new(MemoryStore::new()));
        assert_eq!(repo.load().await.unwrap(), SiteConfig::default());
    }

    #[tokio::test]
    async fn test_update_persists_each_key() {
        let store = MemoryStore::new();
        let repo = SiteConfigRepository::new(Arc::new(store.clone()));

        let updated = repo
            .update(&SiteConfigPatch {
                community_enabled: Some(false),
                announcement: Some("Closed for the holidays".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(!updated.community_enabled);

        assert_eq!(
            store.get(keys::COMMUNITY_ENABLED).await.unwrap().as_deref(),
            Some("false")
        );
        assert_eq!(
            store.get(keys::ANNOUNCEMENT).await.unwrap().as_deref(),
            Some("\"Closed for the holidays\"")
        );
        assert_eq!(store.get(keys::MAINTENANCE_MODE).await.unwrap(), None);

        // a fresh repository over the same store sees the change
        let reloaded = SiteConfigRepository::new(Arc::new(store)).load().await.unwrap();
        assert_eq!(reloaded, updated);
    }
}
