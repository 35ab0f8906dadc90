//! Release feed model and update detection.
//!
//! This module handles:
//! - Fetching the latest release descriptor from the feed
//! - Deciding whether it differs from the running version
//! - Selecting the installable asset

mod checker;
mod version;

pub use checker::ReleaseChecker;
pub use version::VersionPolicy;

use serde::Deserialize;

/// Substring that marks an asset as the updater itself.
const UPDATER_MARKER: &str = "updater";

/// A published release as described by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseDescriptor {
    /// Release tag, compared against the running version.
    pub version: String,
    /// Downloadable assets in feed order.
    pub assets: Vec<AssetDescriptor>,
}

/// A downloadable release artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// File name as published.
    pub file_name: String,
    /// Direct download URL.
    pub download_url: String,
}

/// A release that should be installed, with the asset chosen for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailableUpdate {
    /// The release.
    pub release: ReleaseDescriptor,
    /// The asset to download.
    pub asset: AssetDescriptor,
}

/// Wire shape of the feed response.
#[derive(Debug, Deserialize)]
pub(crate) struct FeedRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<FeedAsset>,
}

#[derive(Debug, Deserialize)]
struct FeedAsset {
    name: String,
    browser_download_url: String,
}

impl From<FeedRelease> for ReleaseDescriptor {
    fn from(feed: FeedRelease) -> Self {
        Self {
            version: feed.tag_name,
            assets: feed
                .assets
                .into_iter()
                .map(|a| AssetDescriptor {
                    file_name: a.name,
                    download_url: a.browser_download_url,
                })
                .collect(),
        }
    }
}

impl AssetDescriptor {
    /// Whether this asset is an installable launcher build.
    ///
    /// The name must end with `suffix` (case-sensitive) and must not contain
    /// `updater` in any case. An empty suffix matches no asset.
    #[must_use]
    pub fn is_installable(&self, suffix: &str) -> bool {
        !suffix.is_empty()
            && self.file_name.ends_with(suffix)
            && !self.file_name.to_lowercase().contains(UPDATER_MARKER)
    }
}

impl ReleaseDescriptor {
    /// First installable asset in feed order.
    #[must_use]
    pub fn select_asset(&self, suffix: &str) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|a| a.is_installable(suffix))
    }
}
