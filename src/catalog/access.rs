//! Derives what the current session may see and download.
//!
//! | Viewer     | Items                               | Community            |
//! |------------|-------------------------------------|----------------------|
//! | anonymous  | none (landing summary only)         | hidden               |
//! | trial      | all visible, trial tier downloadable | hidden              |
//! | member     | all downloadable                    | iff enabled on site  |
//!
//! Admin privilege only adds the admin console entry point.

use tracing::info;

use super::{AssetFetcher, AssetRef, Catalog, CatalogEntry, CommunityFeature, EntryKind, Tier};
use super::MANUALS_FOLDER;
use crate::db::SiteConfig;
use crate::error::AccessError;
use crate::session::{Principal, Viewer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    Login,
    Register,
    StartTrial,
    /// Shown to trial members: register with a purchase code
    Upgrade,
    Logout,
    AdminConsole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Downloadable,
    /// Visible, but download and manual view are disabled
    Locked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub entry: CatalogEntry,
    pub access: Access,
}

/// Landing page counts, shown to everyone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogSummary {
    pub manuals: usize,
    pub config_files: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogView {
    pub viewer: Viewer,
    pub summary: CatalogSummary,
    pub entry_points: Vec<EntryPoint>,
    pub items: Vec<CatalogItem>,
    /// `None` when the community tab is hidden
    pub community: Option<Vec<CommunityFeature>>,
    pub announcement: Option<String>,
    pub maintenance_mode: bool,
}

impl CatalogView {
    pub fn visible(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.items.iter().map(|item| &item.entry)
    }

    pub fn downloadable(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.with_access(Access::Downloadable)
    }

    pub fn locked(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.with_access(Access::Locked)
    }

    pub fn can_download(&self, id: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.entry.id == id && item.access == Access::Downloadable)
    }

    pub fn offers(&self, entry_point: EntryPoint) -> bool {
        self.entry_points.contains(&entry_point)
    }

    pub fn community_tab(&self) -> bool {
        self.community.is_some()
    }

    fn with_access(&self, access: Access) -> impl Iterator<Item = &CatalogEntry> {
        self.items
            .iter()
            .filter(move |item| item.access == access)
            .map(|item| &item.entry)
    }
}

#[derive(Debug, Clone)]
pub struct CatalogAccess {
    catalog: Catalog,
}

impl CatalogAccess {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Compute the view for `principal` under the current site settings.
    pub fn evaluate(&self, principal: &Principal, site: &SiteConfig) -> CatalogView {
        let mut entry_points = Vec::new();
        let (items, community) = match principal.viewer {
            Viewer::Anonymous => {
                entry_points.extend([EntryPoint::Login, EntryPoint::Register, EntryPoint::StartTrial]);
                (Vec::new(), None)
            }
            Viewer::Trial { .. } => {
                entry_points.extend([EntryPoint::Upgrade, EntryPoint::Logout]);
                let items = self.items(|entry| match entry.tier_required {
                    Tier::Trial => Access::Downloadable,
                    Tier::Standard => Access::Locked,
                });
                (items, None)
            }
            Viewer::Member => {
                entry_points.push(EntryPoint::Logout);
                let community = site
                    .community_enabled
                    .then(|| self.catalog.community().to_vec());
                (self.items(|_| Access::Downloadable), community)
            }
        };
        if principal.is_admin {
            entry_points.push(EntryPoint::AdminConsole);
        }

        CatalogView {
            viewer: principal.viewer,
            summary: CatalogSummary {
                manuals: self.catalog.count(EntryKind::Manual),
                config_files: self.catalog.count(EntryKind::ConfigFile),
            },
            entry_points,
            items,
            community,
            announcement: (!site.announcement.is_empty()).then(|| site.announcement.clone()),
            maintenance_mode: site.maintenance_mode,
        }
    }

    /// Hand the entry's asset to `fetcher` if the view allows it. The
    /// transfer itself is not awaited.
    pub fn download(
        &self,
        view: &CatalogView,
        id: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<AssetRef, AccessError> {
        let entry = self.permitted(view, id)?;
        info!(id, file = %entry.asset.filename, "Download dispatched");
        fetcher.fetch(&entry.asset);
        Ok(entry.asset.clone())
    }

    /// Open the companion manual of a configuration file.
    pub fn view_manual(
        &self,
        view: &CatalogView,
        id: &str,
        fetcher: &dyn AssetFetcher,
    ) -> Result<AssetRef, AccessError> {
        let entry = self.permitted(view, id)?;
        let manual = entry
            .manual
            .as_ref()
            .ok_or_else(|| AccessError::NoManual(id.to_string()))?;
        let asset = AssetRef::new(MANUALS_FOLDER, manual.clone());
        info!(id, file = %asset.filename, "Manual view dispatched");
        fetcher.open(&asset);
        Ok(asset)
    }

    fn permitted(&self, view: &CatalogView, id: &str) -> Result<&CatalogEntry, AccessError> {
        let entry = self
            .catalog
            .get(id)
            .ok_or_else(|| AccessError::UnknownEntry(id.to_string()))?;
        if !view.can_download(id) {
            return Err(AccessError::NotPermitted(id.to_string()));
        }
        Ok(entry)
    }

    fn items(&self, access: impl Fn(&CatalogEntry) -> Access) -> Vec<CatalogItem> {
        self.catalog
            .entries()
            .iter()
            .map(|entry| CatalogItem {
                entry: entry.clone(),
                access: access(entry),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::assets::RecordingFetcher;

    fn access() -> CatalogAccess {
        CatalogAccess::new(Catalog::builtin())
    }

    fn principal(viewer: Viewer) -> Principal {
        Principal {
            viewer,
            is_admin: false,
        }
    }

    fn ids<'a>(entries: impl Iterator<Item = &'a CatalogEntry>) -> Vec<&'a str> {
        entries.map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_anonymous_sees_summary_only() {
        let view = access().evaluate(&principal(Viewer::Anonymous), &SiteConfig::default());
        assert_eq!(view.downloadable().count(), 0);
        assert_eq!(view.visible().count(), 0);
        assert!(!view.community_tab());
        assert_eq!(
            view.summary,
            CatalogSummary {
                manuals: 5,
                config_files: 3
            }
        );
        assert!(view.offers(EntryPoint::Login));
        assert!(view.offers(EntryPoint::Register));
        assert!(view.offers(EntryPoint::StartTrial));
        assert!(!view.offers(EntryPoint::Logout));
        assert!(!view.offers(EntryPoint::AdminConsole));
    }

    #[test]
    fn test_member_gets_full_catalog() {
        let access = access();
        let view = access.evaluate(&principal(Viewer::Member), &SiteConfig::default());
        assert_eq!(
            ids(view.downloadable()),
            ids(access.catalog().entries().iter())
        );
        assert_eq!(view.locked().count(), 0);
        assert!(view.community_tab());
        assert!(view.offers(EntryPoint::Logout));
        assert!(!view.offers(EntryPoint::Upgrade));
    }

    #[test]
    fn test_trial_gets_subset_and_locked_rest() {
        let access = access();
        let view = access.evaluate(
            &principal(Viewer::Trial {
                remaining_days: 2,
                allowed: true,
            }),
            &SiteConfig::default(),
        );
        assert_eq!(ids(view.downloadable()), vec!["manual-1", "dsl-writegenius"]);
        assert_eq!(view.visible().count(), access.catalog().entries().len());
        assert_eq!(view.locked().count(), 6);
        assert!(view.offers(EntryPoint::Upgrade));
        assert!(!view.community_tab());
    }

    #[test]
    fn test_community_toggle() {
        let access = access();
        let site = SiteConfig {
            community_enabled: false,
            ..SiteConfig::default()
        };
        let view = access.evaluate(&principal(Viewer::Member), &site);
        assert!(!view.community_tab());
        assert_eq!(view.downloadable().count(), 8);
    }

    #[test]
    fn test_admin_overlay_is_tier_independent() {
        let access = access();
        for viewer in [
            Viewer::Anonymous,
            Viewer::Trial {
                remaining_days: 1,
                allowed: true,
            },
            Viewer::Member,
        ] {
            let view = access.evaluate(
                &Principal {
                    viewer,
                    is_admin: true,
                },
                &SiteConfig::default(),
            );
            assert!(view.offers(EntryPoint::AdminConsole));
            let plain = access.evaluate(&principal(viewer), &SiteConfig::default());
            assert_eq!(view.items, plain.items);
        }
    }

    #[test]
    fn test_announcement_and_maintenance_surface() {
        let site = SiteConfig {
            community_enabled: true,
            maintenance_mode: true,
            announcement: "Scheduled maintenance tonight".to_string(),
        };
        let view = access().evaluate(&principal(Viewer::Member), &site);
        assert!(view.maintenance_mode);
        assert_eq!(
            view.announcement.as_deref(),
            Some("Scheduled maintenance tonight")
        );
        assert_eq!(view.downloadable().count(), 8);

        let quiet = access().evaluate(&principal(Viewer::Member), &SiteConfig::default());
        assert!(quiet.announcement.is_none());
    }

    #[test]
    fn test_download_dispatches_asset() {
        let access = access();
        let fetcher = RecordingFetcher::default();
        let view = access.evaluate(&principal(Viewer::Member), &SiteConfig::default());

        let asset = access.download(&view, "dsl-youtube", &fetcher).unwrap();
        assert_eq!(asset, AssetRef::new("dsl-files", "Youtubemaker.yml"));
        assert_eq!(fetcher.fetched(), vec![asset]);
    }

    #[test]
    fn test_download_refusals() {
        let access = access();
        let fetcher = RecordingFetcher::default();

        let anonymous = access.evaluate(&principal(Viewer::Anonymous), &SiteConfig::default());
        assert_eq!(
            access.download(&anonymous, "manual-1", &fetcher),
            Err(AccessError::NotPermitted("manual-1".to_string()))
        );

        let trial = access.evaluate(
            &principal(Viewer::Trial {
                remaining_days: 3,
                allowed: true,
            }),
            &SiteConfig::default(),
        );
        assert!(access.download(&trial, "manual-1", &fetcher).is_ok());
        assert_eq!(
            access.download(&trial, "manual-2", &fetcher),
            Err(AccessError::NotPermitted("manual-2".to_string()))
        );
        assert_eq!(
            access.download(&trial, "nope", &fetcher),
            Err(AccessError::UnknownEntry("nope".to_string()))
        );

        assert_eq!(fetcher.fetched().len(), 1);
    }

    #[test]
    fn test_view_manual() {
        let access = access();
        let fetcher = RecordingFetcher::default();
        let member = access.evaluate(&principal(Viewer::Member), &SiteConfig::default());

        let opened = access.view_manual(&member, "dsl-image", &fetcher).unwrap();
        assert_eq!(
            opened,
            AssetRef::new("manuals", "image_master_ai_master_guide.pdf")
        );
        assert_eq!(fetcher.opened(), vec![opened]);

        assert_eq!(
            access.view_manual(&member, "manual-3", &fetcher),
            Err(AccessError::NoManual("manual-3".to_string()))
        );

        let trial = access.evaluate(
            &principal(Viewer::Trial {
                remaining_days: 3,
                allowed: true,
            }),
            &SiteConfig::default(),
        );
        assert_eq!(
            access.view_manual(&trial, "dsl-image", &fetcher),
            Err(AccessError::NotPermitted("dsl-image".to_string()))
        );
        assert!(access.view_manual(&trial, "dsl-writegenius", &fetcher).is_ok());
    }
}
