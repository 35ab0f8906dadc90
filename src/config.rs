//! Configuration for launcher-update.

use crate::release::VersionPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Repository whose latest release is tracked.
pub const DEFAULT_REPO: &str = "aarubikarubi/DailyGameLauncher";

/// Default release feed API root.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Name of the configuration file inside the project config directory.
pub const CONFIG_FILE_NAME: &str = "update.toml";

/// Top-level updater configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Release feed settings.
    #[serde(default)]
    pub feed: FeedConfig,

    /// Download and staging settings.
    #[serde(default)]
    pub download: DownloadConfig,

    /// Handoff settings.
    #[serde(default)]
    pub handoff: HandoffConfig,

    /// Entry point overrides.
    #[serde(default)]
    pub entry: EntryConfig,

    /// Log level.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Release feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Repository in `owner/repo` form.
    #[serde(default = "default_repo")]
    pub repo: String,

    /// API root the `repos/{repo}/releases/latest` path is appended to.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Identifying `User-Agent` header, required by the feed.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds.
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,

    /// How a remote tag is compared with the running version.
    #[serde(default)]
    pub version_policy: VersionPolicy,

    /// File name suffix an asset must end with to be installable. An empty
    /// suffix matches nothing.
    #[serde(default = "default_asset_suffix")]
    pub asset_suffix: String,
}

/// Download configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory the staged file is written to.
    #[serde(default = "std::env::temp_dir")]
    pub staging_dir: PathBuf,

    /// Fixed file name of the staged asset.
    #[serde(default = "default_staged_file_name")]
    pub staged_file_name: String,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Overall transfer timeout in seconds.
    #[serde(default = "default_download_timeout")]
    pub timeout_secs: u64,
}

/// Handoff configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffConfig {
    /// Explicit updater executable. Defaults to `launcher-swap` next to
    /// the running executable.
    #[serde(default)]
    pub updater_path: Option<PathBuf>,

    /// How long to wait for the updater's ready marker.
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_secs: u64,

    /// How long the updater waits for this process to exit.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_secs: u64,

    /// How long to wait for the Launch Monitor to allow exiting.
    #[serde(default = "default_exit_wait")]
    pub exit_wait_secs: u64,
}

/// Entry point configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Companion launcher to relaunch instead of the running executable.
    #[serde(default)]
    pub launcher: Option<PathBuf>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            repo: default_repo(),
            api_base: default_api_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_feed_timeout(),
            version_policy: VersionPolicy::default(),
            asset_suffix: default_asset_suffix(),
        }
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir(),
            staged_file_name: default_staged_file_name(),
            connect_timeout_secs: default_connect_timeout(),
            timeout_secs: default_download_timeout(),
        }
    }
}

impl Default for HandoffConfig {
    fn default() -> Self {
        Self {
            updater_path: None,
            ready_timeout_secs: default_ready_timeout(),
            wait_timeout_secs: default_wait_timeout(),
            exit_wait_secs: default_exit_wait(),
        }
    }
}

fn default_repo() -> String {
    DEFAULT_REPO.to_string()
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_user_agent() -> String {
    "DailyGameLauncher-Updater".to_string()
}

fn default_asset_suffix() -> String {
    // The tracked feed publishes Windows builds only.
    ".exe".to_string()
}

fn default_staged_file_name() -> String {
    if cfg!(windows) {
        "DailyGameLauncher_update.exe".to_string()
    } else {
        "DailyGameLauncher_update".to_string()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const fn default_feed_timeout() -> u64 {
    5
}

const fn default_connect_timeout() -> u64 {
    15
}

const fn default_download_timeout() -> u64 {
    300
}

const fn default_ready_timeout() -> u64 {
    10
}

const fn default_wait_timeout() -> u64 {
    60
}

const fn default_exit_wait() -> u64 {
    30
}

impl FeedConfig {
    /// URL of the "latest release" endpoint.
    #[must_use]
    pub fn latest_release_url(&self) -> String {
        format!(
            "{}/repos/{}/releases/latest",
            self.api_base.trim_end_matches('/'),
            self.repo
        )
    }

    /// Request timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DownloadConfig {
    /// Full path of the staged file.
    #[must_use]
    pub fn staged_path(&self) -> PathBuf {
        self.staging_dir.join(&self.staged_file_name)
    }
}

impl UpdaterConfig {
    /// Default configuration file location, if a project directory exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "DailyGameLauncher")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Load the default configuration file if present, else defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_default() -> crate::Result<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Save configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn to_file(&self, path: &Path) -> crate::Result<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
