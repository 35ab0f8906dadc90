//! Release feed checker.

use super::{AvailableUpdate, FeedRelease, ReleaseDescriptor, VersionPolicy};
use crate::config::FeedConfig;
use crate::error::{Error, Result};
use reqwest::header::{ACCEPT, USER_AGENT};
use tracing::{debug, info, warn};

/// Queries the release feed and decides whether to update.
#[derive(Debug, Clone)]
pub struct ReleaseChecker {
    client: reqwest::Client,
    url: String,
    user_agent: String,
    policy: VersionPolicy,
    asset_suffix: String,
}

impl ReleaseChecker {
    /// Create a checker for the configured feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("Cannot build feed client: {e}")))?;

        Ok(Self {
            client,
            url: config.latest_release_url(),
            user_agent: config.user_agent.clone(),
            policy: config.version_policy,
            asset_suffix: config.asset_suffix.clone(),
        })
    }

    /// Feed endpoint queried by this checker.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch and parse the latest release descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] on transport failure or a non-success
    /// status, and [`Error::Feed`] if the body is not a usable release.
    pub async fn fetch_latest(&self) -> Result<ReleaseDescriptor> {
        debug!("Fetching latest release from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .header(USER_AGENT, &self.user_agent)
            .header(ACCEPT, "application/vnd.github+json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Network(format!("Release feed returned {status}")));
        }

        let feed: FeedRelease = response.json().await?;
        let release = ReleaseDescriptor::from(feed);
        if release.version.trim().is_empty() {
            return Err(Error::Feed("empty tag_name".to_string()));
        }

        Ok(release)
    }

    /// Decide whether `release` should replace `current_version`.
    ///
    /// Returns `None` when the versions match or when no asset passes the
    /// installable filter.
    #[must_use]
    pub fn evaluate(&self, current_version: &str, release: ReleaseDescriptor) -> Option<AvailableUpdate> {
        if !self.policy.is_update(current_version, &release.version) {
            debug!("Up to date at {current_version}");
            return None;
        }

        let Some(asset) = release.select_asset(&self.asset_suffix).cloned() else {
            info!(
                "Release {} differs from {current_version} but has no installable asset",
                release.version
            );
            return None;
        };

        info!(
            "Update available: {} -> {} ({})",
            current_version, release.version, asset.file_name
        );
        Some(AvailableUpdate { release, asset })
    }

    /// Check the feed for an installable update.
    ///
    /// Failures are logged and reported as "no update" so that a flaky
    /// connection never blocks the launcher.
    pub async fn check_for_update(&self, current_version: &str) -> Option<AvailableUpdate> {
        match self.fetch_latest().await {
            Ok(release) => self.evaluate(current_version, release),
            Err(e) => {
                warn!("Update check failed: {e}");
                None
            }
        }
    }
}
