//! Handing catalog assets to the environment.
//!
//! Dispatch is fire-and-forget: nothing checks that the file exists before a
//! transfer starts, and the caller never learns whether it succeeded.

use parking_lot::Mutex;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::AssetRef;

pub trait AssetFetcher: Send + Sync {
    /// Start a download of `asset`
    fn fetch(&self, asset: &AssetRef);

    /// Open `asset` for viewing. Terminal front ends have no viewer of their
    /// own; they open a manual by showing where it lives.
    fn open(&self, asset: &AssetRef);
}

/// Serves assets from `<assets_root>/<folder>/<filename>` by copying them
/// into a downloads directory on a background task.
pub struct LocalAssetFetcher {
    assets_root: PathBuf,
    downloads_dir: PathBuf,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl LocalAssetFetcher {
    pub fn new(assets_root: impl Into<PathBuf>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            assets_root: assets_root.into(),
            downloads_dir: downloads_dir.into(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// The file a viewer should be pointed at when `asset` is opened
    pub fn viewer_path(&self, asset: &AssetRef) -> PathBuf {
        asset.resolve(&self.assets_root)
    }

    /// Where a fetched asset ends up
    pub fn destination(&self, asset: &AssetRef) -> PathBuf {
        self.downloads_dir.join(&asset.filename)
    }

    /// Wait for transfers started so far. Only used before process exit.
    pub async fn settle(&self) {
        let pending: Vec<_> = std::mem::take(&mut *self.pending.lock());
        for handle in pending {
            if let Err(e) = handle.await {
                warn!(error = %e, "Asset transfer task failed");
            }
        }
    }
}

impl AssetFetcher for LocalAssetFetcher {
    fn fetch(&self, asset: &AssetRef) {
        let source = asset.resolve(&self.assets_root);
        let target = self.destination(asset);
        let downloads_dir = self.downloads_dir.clone();

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(file = %asset.filename, "No async runtime; download not started");
            return;
        };

        let handle = runtime.spawn(async move {
            if let Err(e) = tokio::fs::create_dir_all(&downloads_dir).await {
                warn!(dir = %downloads_dir.display(), error = %e, "Cannot create downloads directory");
                return;
            }
            match tokio::fs::copy(&source, &target).await {
                Ok(bytes) => info!(
                    from = %source.display(),
                    to = %target.display(),
                    bytes,
                    "Download complete"
                ),
                Err(e) => warn!(from = %source.display(), error = %e, "Download failed"),
            }
        });
        self.pending.lock().push(handle);
    }

    /// Only records the request; the caller shows [`Self::viewer_path`].
    fn open(&self, asset: &AssetRef) {
        let path = self.viewer_path(asset);
        info!(path = %path.display(), "Opening asset for viewing");
    }
}

/// Remembers every dispatched asset.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct RecordingFetcher {
    fetched: Mutex<Vec<AssetRef>>,
    opened: Mutex<Vec<AssetRef>>,
}

#[cfg(test)]
impl RecordingFetcher {
    pub(crate) fn fetched(&self) -> Vec<AssetRef> {
        self.fetched.lock().clone()
    }

    pub(crate) fn opened(&self) -> Vec<AssetRef> {
        self.opened.lock().clone()
    }
}

#[cfg(test)]
impl AssetFetcher for RecordingFetcher {
    fn fetch(&self, asset: &AssetRef) {
        self.fetched.lock().push(asset.clone());
    }

    fn open(&self, asset: &AssetRef) {
        self.opened.lock().push(asset.clone());
    }
}
