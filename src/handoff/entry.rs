//! How the launcher was started, and therefore what must be relaunched.

use crate::config::EntryConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable a companion launcher sets to its own path.
pub const HOST_ENV: &str = "LAUNCHER_UPDATE_HOST";

/// File stem of the swap executor binary.
pub const UPDATER_STEM: &str = "launcher-swap";

/// Entry point resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPoint {
    /// Started directly; the running executable is replaced and relaunched.
    Standalone {
        /// Running executable.
        executable: PathBuf,
    },
    /// Started through a companion launcher, which is replaced and
    /// relaunched instead of the running executable.
    Hosted {
        /// Companion launcher binary.
        launcher: PathBuf,
        /// Running executable.
        executable: PathBuf,
    },
}

impl EntryPoint {
    /// Resolve the entry point from configuration, then [`HOST_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if the running executable path cannot be determined.
    pub fn resolve(config: &EntryConfig) -> Result<Self> {
        let executable = std::env::current_exe()?;
        let launcher = config.launcher.clone().or_else(|| {
            std::env::var_os(HOST_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });

        let entry = Self::from_parts(executable, launcher);
        debug!("Resolved entry point: {entry:?}");
        Ok(entry)
    }

    /// Build an entry point from known paths.
    #[must_use]
    pub fn from_parts(executable: PathBuf, launcher: Option<PathBuf>) -> Self {
        match launcher {
            Some(launcher) => Self::Hosted {
                launcher,
                executable,
            },
            None => Self::Standalone { executable },
        }
    }

    /// Path overwritten by the swap and started afterwards.
    #[must_use]
    pub fn destination(&self) -> &Path {
        match self {
            Self::Standalone { executable } => executable,
            Self::Hosted { launcher, .. } => launcher,
        }
    }

    /// The running executable.
    #[must_use]
    pub fn executable(&self) -> &Path {
        match self {
            Self::Standalone { executable } | Self::Hosted { executable, .. } => executable,
        }
    }

    /// `launcher-swap` next to the running executable.
    #[must_use]
    pub fn default_updater_path(&self) -> PathBuf {
        let name = format!("{UPDATER_STEM}{}", std::env::consts::EXE_SUFFIX);
        self.executable()
            .parent()
            .map_or_else(|| PathBuf::from(&name), |dir| dir.join(&name))
    }
}
