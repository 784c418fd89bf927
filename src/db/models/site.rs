//! Site-wide settings controlled from the admin console.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub community_enabled: bool,
    pub maintenance_mode: bool,
    pub announcement: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            community_enabled: true,
            maintenance_mode: false,
            announcement: String::new(),
        }
    }
}

/// Partial update; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfigPatch {
    pub community_enabled: Option<bool>,
    pub maintenance_mode: Option<bool>,
    pub announcement: Option<String>,
}

impl SiteConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.community_enabled.is_none()
            && self.maintenance_mode.is_none()
            && self.announcement.is_none()
    }

    /// Merge into `config`, returning whether anything changed.
    pub fn apply(&self, config: &mut SiteConfig) -> bool {
        let before = config.clone();
        if let Some(enabled) = self.community_enabled {
            config.community_enabled = enabled;
        }
        if let Some(maintenance) = self.maintenance_mode {
            config.maintenance_mode = maintenance;
        }
        if let Some(announcement) = &self.announcement {
            config.announcement = announcement.clone();
        }
        *config != before
    }
}
