//! Static catalog of downloadable manuals and DSL configuration files, plus
//! the member community features.

mod access;
mod assets;

pub use access::{Access, CatalogAccess, CatalogItem, CatalogSummary, CatalogView, EntryPoint};
pub use assets::{AssetFetcher, LocalAssetFetcher};

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Folder holding the PDF manuals
pub const MANUALS_FOLDER: &str = "manuals";
/// Folder holding the DSL workflow files
pub const DSL_FOLDER: &str = "dsl-files";

/// Lowest account tier an entry is downloadable at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Trial,
    Standard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Manual,
    ConfigFile,
}

/// A named file within a named folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    pub folder: String,
    pub filename: String,
}

impl AssetRef {
    pub fn new(folder: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            filename: filename.into(),
        }
    }

    /// Site-relative location, e.g. `/downloads/manuals/guide.pdf`
    pub fn href(&self, assets_prefix: &str) -> String {
        format!(
            "/{}/{}/{}",
            assets_prefix.trim_matches('/'),
            self.folder,
            self.filename
        )
    }

    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.folder).join(&self.filename)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: EntryKind,
    /// Label/value pairs shown with the entry (pages, level, features, ...)
    pub metadata: Vec<(String, String)>,
    pub asset: AssetRef,
    /// Companion manual opened by the "view manual" action
    pub manual: Option<String>,
    pub tier_required: Tier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommunityFeature {
    pub id: String,
    pub title: String,
    pub description: String,
    pub action: String,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    community: Vec<CommunityFeature>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>, community: Vec<CommunityFeature>) -> Self {
        Self { entries, community }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn community(&self) -> &[CommunityFeature] {
        &self.community
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn count(&self, kind: EntryKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// The portal's shipped catalog.
    pub fn builtin() -> Self {
        let entries = vec![
            manual(
                "manual-1",
                "The Ultimate DIFY Build Guide",
                "DIFY from the basics through advanced use",
                &[("category", "Basics"), ("pages", "about 25"), ("level", "Beginner to intermediate")],
                "dify_ultimate_guide.pdf",
                Tier::Trial,
            ),
            manual(
                "manual-2",
                "Pro App Building Master Manual",
                "From workflow design to production-grade apps",
                &[("category", "Advanced"), ("pages", "about 30"), ("level", "Intermediate to advanced")],
                "dify_app_build_master_manual.pdf",
                Tier::Standard,
            ),
            manual(
                "manual-3",
                "WriteGenius Pro Master Guide",
                "Complete walkthrough of the automatic blog writer",
                &[("category", "App guide"), ("pages", "about 20"), ("level", "All levels")],
                "writegenius_pro_master_guide.pdf",
                Tier::Standard,
            ),
            manual(
                "manual-4",
                "YouTube Script Pro Master Guide",
                "Secrets of scripts that go viral",
                &[("category", "App guide"), ("pages", "about 18"), ("level", "All levels")],
                "youtube_script_pro_master_guide.pdf",
                Tier::Standard,
            ),
            manual(
                "manual-5",
                "Image Master AI Master Guide",
                "Conversational prompting for image generation",
                &[("category", "App guide"), ("pages", "about 16"), ("level", "All levels")],
                "image_master_ai_master_guide.pdf",
                Tier::Standard,
            ),
            dsl_file(
                "dsl-writegenius",
                "WriteGenius Pro",
                "Generates SEO-optimized blog posts",
                &["Google search integration", "SEO analysis", "Multiple AI models", "Reference URL appending"],
                "WriteGenius Pro.yml",
                "writegenius_pro_master_guide.pdf",
                Tier::Trial,
            ),
            dsl_file(
                "dsl-youtube",
                "YouTube Script Pro",
                "Generates video scripts and thumbnails",
                &["Planning", "Outline", "Script writing", "Thumbnail generation"],
                "Youtubemaker.yml",
                "youtube_script_pro_master_guide.pdf",
                Tier::Standard,
            ),
            dsl_file(
                "dsl-image",
                "Image Master AI",
                "Conversational image generation",
                &["Chat interface", "Multiple AI backends", "Prompt optimization", "Revisions"],
                "imageGenerator.yml",
                "image_master_ai_master_guide.pdf",
                Tier::Standard,
            ),
        ];

        let community = vec![
            CommunityFeature {
                id: "community".to_string(),
                title: "Members-only community".to_string(),
                description: "Trade tips, ask questions and build together with other members."
                    .to_string(),
                action: "Join the workspace".to_string(),
            },
            CommunityFeature {
                id: "consulting".to_string(),
                title: "One-on-one consulting".to_string(),
                description: "A free 30 minute session to work through your problem directly."
                    .to_string(),
                action: "Book a session".to_string(),
            },
        ];

        Self::new(entries, community)
    }
}

fn manual(
    id: &str,
    title: &str,
    description: &str,
    metadata: &[(&str, &str)],
    filename: &str,
    tier_required: Tier,
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        kind: EntryKind::Manual,
        metadata: metadata
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        asset: AssetRef::new(MANUALS_FOLDER, filename),
        manual: None,
        tier_required,
    }
}

fn dsl_file(
    id: &str,
    title: &str,
    description: &str,
    features: &[&str],
    filename: &str,
    manual: &str,
    tier_required: Tier,
) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        kind: EntryKind::ConfigFile,
        metadata: features
            .iter()
            .map(|f| ("feature".to_string(), f.to_string()))
            .collect(),
        asset: AssetRef::new(DSL_FOLDER, filename),
        manual: Some(manual.to_string()),
        tier_required,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_catalog_shape() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.count(EntryKind::Manual), 5);
        assert_eq!(catalog.count(EntryKind::ConfigFile), 3);
        assert_eq!(catalog.community().len(), 2);

        let ids: HashSet<_> = catalog.entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.entries().len());
    }

    #[test]
    fn test_builtin_trial_subset() {
        let catalog = Catalog::builtin();
        let trial: Vec<_> = catalog
            .entries()
            .iter()
            .filter(|e| e.tier_required == Tier::Trial)
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(trial, vec!["manual-1", "dsl-writegenius"]);
    }

    #[test]
    fn test_dsl_manuals_exist_in_catalog() {
        let catalog = Catalog::builtin();
        let manuals: HashSet<_> = catalog
            .entries()
            .iter()
            .filter(|e| e.kind == EntryKind::Manual)
            .map(|e| e.asset.filename.as_str())
            .collect();
        for entry in catalog.entries() {
            if let Some(manual) = &entry.manual {
                assert!(manuals.contains(manual.as_str()), "{} missing", manual);
            }
        }
    }

    #[test]
    fn test_asset_href_and_resolve() {
        let asset = AssetRef::new(DSL_FOLDER, "WriteGenius Pro.yml");
        assert_eq!(asset.href("downloads"), "/downloads/dsl-files/WriteGenius Pro.yml");
        assert_eq!(asset.href("/downloads/"), "/downloads/dsl-files/WriteGenius Pro.yml");
        assert_eq!(
            asset.resolve(Path::new("/srv")),
            PathBuf::from("/srv/dsl-files/WriteGenius Pro.yml")
        );
    }

    #[test]
    fn test_get() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.get("manual-2").map(|e| e.asset.filename.as_str()),
            Some("dify_app_build_master_manual.pdf")
        );
        assert!(catalog.get("manual-99").is_none());
    }
}
