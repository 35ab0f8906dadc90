//! Remote/current version comparison.

use semver::Version;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the remote release tag is compared with the running version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionPolicy {
    /// Any difference between the tags is an update, including an older
    /// remote tag. Matches the behavior of the launcher's earlier releases.
    #[default]
    Inequality,
    /// The remote tag must be a strictly greater semantic version.
    Semver,
}

impl VersionPolicy {
    /// Whether `remote` should replace `current`.
    #[must_use]
    pub fn is_update(self, current: &str, remote: &str) -> bool {
        match self {
            Self::Inequality => remote != current,
            Self::Semver => match (parse_tag(current), parse_tag(remote)) {
                (Some(current), Some(remote)) => remote > current,
                _ => {
                    debug!("Unparsable version tag (current {current:?}, remote {remote:?})");
                    false
                }
            },
        }
    }
}

/// Parse a release tag such as `v3.0.1` into a semantic version.
fn parse_tag(tag: &str) -> Option<Version> {
    let trimmed = tag.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(bare).ok()
}
