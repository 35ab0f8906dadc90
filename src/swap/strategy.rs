//! Platform strategies for installing the staged file.
//!
//! Both strategies write the replacement next to the destination first and
//! then rename it into place, so the destination is never observed half
//! written. The staged source is removed only after the rename succeeded.

use crate::error::{Error, Result};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Installs a staged executable over a destination path.
pub trait Swapper: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Replace `destination` with `staged`, preserving executable
    /// attributes, then remove `staged`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Swap`] if the destination could not be replaced.
    /// `staged` is left in place on failure.
    fn install(&self, staged: &Path, destination: &Path) -> Result<()>;
}

/// Rename over the destination. A rename survives open handles on Unix, so
/// one attempt is enough.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenameOverOpen;

/// Rename over the destination, retrying while the OS still holds the old
/// image (sharing violations shortly after exit are common on Windows).
#[derive(Debug, Clone, Copy)]
pub struct ReplaceAfterExit {
    /// Total rename attempts.
    pub attempts: u32,
    /// Delay before the first retry; doubles each time.
    pub initial_delay: Duration,
}

impl Default for ReplaceAfterExit {
    fn default() -> Self {
        Self {
            attempts: 8,
            initial_delay: Duration::from_millis(100),
        }
    }
}

/// Strategy for the build target.
#[cfg(windows)]
pub type PlatformSwapper = ReplaceAfterExit;

/// Strategy for the build target.
#[cfg(not(windows))]
pub type PlatformSwapper = RenameOverOpen;

impl Swapper for RenameOverOpen {
    fn name(&self) -> &'static str {
        "rename-over-open"
    }

    fn install(&self, staged: &Path, destination: &Path) -> Result<()> {
        let prepared = prepare(staged, destination)?;
        prepared
            .persist(destination)
            .map_err(|e| swap_error(destination, &e.error))?;
        finish(staged, destination);
        Ok(())
    }
}

impl Swapper for ReplaceAfterExit {
    fn name(&self) -> &'static str {
        "replace-after-exit"
    }

    fn install(&self, staged: &Path, destination: &Path) -> Result<()> {
        let mut prepared = prepare(staged, destination)?;
        let mut delay = self.initial_delay;
        let attempts = self.attempts.max(1);

        for attempt in 1..=attempts {
            match prepared.persist(destination) {
                Ok(_) => {
                    finish(staged, destination);
                    return Ok(());
                }
                Err(e) if attempt < attempts && is_transient(&e.error) => {
                    debug!(
                        "Destination busy (attempt {attempt}/{attempts}): {}",
                        e.error
                    );
                    prepared = e.file;
                    std::thread::sleep(delay);
                    delay *= 2;
                }
                Err(e) => return Err(swap_error(destination, &e.error)),
            }
        }

        Err(Error::Swap(format!(
            "{} still locked after {attempts} attempts",
            destination.display()
        )))
    }
}

/// Copy `staged` into a temp file beside `destination` with the
/// destination's permissions, flushed to disk.
fn prepare(staged: &Path, destination: &Path) -> Result<NamedTempFile> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut source = fs::File::open(staged)
        .map_err(|e| Error::Swap(format!("cannot open staged {}: {e}", staged.display())))?;
    let mut prepared = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Swap(format!("cannot create temp file in {}: {e}", dir.display())))?;

    io::copy(&mut source, prepared.as_file_mut())
        .map_err(|e| Error::Swap(format!("cannot copy staged file: {e}")))?;
    prepared
        .as_file()
        .sync_all()
        .map_err(|e| Error::Swap(format!("cannot flush replacement: {e}")))?;

    copy_permissions(destination, prepared.path())?;
    Ok(prepared)
}

fn copy_permissions(destination: &Path, prepared: &Path) -> Result<()> {
    let permissions = match fs::metadata(destination) {
        Ok(meta) => meta.permissions(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => default_permissions(prepared)?,
        Err(e) => return Err(swap_error(destination, &e)),
    };
    fs::set_permissions(prepared, permissions)
        .map_err(|e| Error::Swap(format!("cannot set permissions: {e}")))
}

#[cfg(unix)]
fn default_permissions(_prepared: &Path) -> Result<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn default_permissions(prepared: &Path) -> Result<fs::Permissions> {
    Ok(fs::metadata(prepared)?.permissions())
}

fn finish(staged: &Path, destination: &Path) {
    info!("Installed {} over {}", staged.display(), destination.display());
    if let Err(e) = fs::remove_file(staged) {
        warn!("Installed, but could not remove staged file {}: {e}", staged.display());
    }
}

fn is_transient(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::PermissionDenied || e.raw_os_error() == Some(32) // ERROR_SHARING_VIOLATION
}

fn swap_error(destination: &Path, e: &io::Error) -> Error {
    Error::Swap(format!("cannot replace {}: {e}", destination.display()))
}
