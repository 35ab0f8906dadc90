//! Command-line interface definition.

use clap::{Parser, ValueEnum};
use launcher_update::release::VersionPolicy;
use launcher_update::UpdaterConfig;
use std::path::PathBuf;

/// Check for a DailyGameLauncher update and hand off to the updater.
#[derive(Parser, Debug)]
#[command(name = "launcher-update")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file.
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Repository whose latest release is tracked (`owner/repo`).
    #[arg(long, env = "LAUNCHER_UPDATE_REPO")]
    pub repo: Option<String>,

    /// Release feed API root.
    #[arg(long, env = "LAUNCHER_UPDATE_API_BASE")]
    pub api_base: Option<String>,

    /// How the remote tag is compared with the running version.
    #[arg(long, value_enum)]
    pub version_policy: Option<CliVersionPolicy>,

    /// Updater executable to hand off to.
    #[arg(long)]
    pub updater: Option<PathBuf>,

    /// Companion launcher to relaunch instead of this executable.
    #[arg(long)]
    pub launcher: Option<PathBuf>,

    /// Install without asking.
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// Only report whether an update is available.
    #[arg(long)]
    pub check_only: bool,

    /// Log level. Overrides `log_level` from the config file.
    #[arg(long, env = "RUST_LOG")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(long)]
    pub log_json: bool,
}

/// Version policy CLI enum.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum CliVersionPolicy {
    /// Any tag difference is an update.
    Inequality,
    /// Only a greater semantic version is an update.
    Semver,
}

impl Cli {
    /// Convert CLI arguments into an `UpdaterConfig`.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file cannot be loaded.
    pub fn to_config(&self) -> color_eyre::Result<UpdaterConfig> {
        // Start with the given file, the default file, or defaults
        let mut config = match self.config {
            Some(ref path) => UpdaterConfig::from_file(path)?,
            None => UpdaterConfig::load_default()?,
        };

        // Override with CLI arguments
        if let Some(ref repo) = self.repo {
            config.feed.repo.clone_from(repo);
        }
        if let Some(ref api_base) = self.api_base {
            config.feed.api_base.clone_from(api_base);
        }
        if let Some(policy) = self.version_policy {
            config.feed.version_policy = policy.into();
        }
        if self.updater.is_some() {
            config.handoff.updater_path.clone_from(&self.updater);
        }
        if self.launcher.is_some() {
            config.entry.launcher.clone_from(&self.launcher);
        }
        if let Some(ref level) = self.log_level {
            config.log_level.clone_from(level);
        }

        Ok(config)
    }
}

impl From<CliVersionPolicy> for VersionPolicy {
    fn from(p: CliVersionPolicy) -> Self {
        match p {
            CliVersionPolicy::Inequality => VersionPolicy::Inequality,
            CliVersionPolicy::Semver => VersionPolicy::Semver,
        }
    }
}
