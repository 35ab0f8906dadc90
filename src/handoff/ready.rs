//! Updater readiness handshake.
//!
//! The updater writes a marker file holding its own pid before it starts
//! waiting on the caller. The caller only commits to exiting once the marker
//! appears while the updater is still alive.

use crate::error::{Error, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Child;
use tokio::time::Instant;
use tracing::{debug, warn};

const POLL_START: Duration = Duration::from_millis(20);
const POLL_MAX: Duration = Duration::from_millis(250);

/// Marker location for a given staged file.
#[must_use]
pub fn marker_path(staged_path: &Path) -> PathBuf {
    staged_path.with_extension("ready")
}

/// Write the ready marker atomically. Called by the updater.
///
/// # Errors
///
/// Returns an error if the marker cannot be written.
pub fn signal_ready(marker: &Path) -> Result<()> {
    let dir = marker
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    writeln!(
        tmp,
        "{} {}",
        std::process::id(),
        chrono::Utc::now().to_rfc3339()
    )?;
    tmp.as_file().sync_all()?;
    tmp.persist(marker).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Read the updater pid from a marker, if present and complete.
pub async fn read_marker(marker: &Path) -> Option<u32> {
    let content = tokio::fs::read_to_string(marker).await.ok()?;
    content.split_whitespace().next()?.parse().ok()
}

/// Remove a marker left by an earlier attempt.
///
/// # Errors
///
/// Returns an error if an existing marker cannot be removed.
pub async fn clear_marker(marker: &Path) -> Result<()> {
    match tokio::fs::remove_file(marker).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Wait until `child` signals readiness through `marker`.
///
/// Returns the pid recorded in the marker. A marker written by any process
/// other than `child` is ignored. If the child exits first or the timeout
/// passes, the child is killed and [`Error::Handshake`] is returned.
///
/// # Errors
///
/// Returns [`Error::Handshake`] when readiness is not confirmed.
pub async fn wait_for_ready(child: &mut Child, marker: &Path, timeout: Duration) -> Result<u32> {
    let deadline = Instant::now() + timeout;
    let mut delay = POLL_START;

    loop {
        if let Some(status) = child.try_wait()? {
            return Err(Error::Handshake(format!(
                "updater exited ({status}) before signalling ready"
            )));
        }

        if let Some(pid) = read_marker(marker).await {
            if child.id() == Some(pid) {
                debug!("Updater {pid} is ready");
                return Ok(pid);
            }
            debug!("Ignoring ready marker from foreign process {pid}");
        }

        let now = Instant::now();
        if now >= deadline {
            warn!("Updater not ready after {timeout:?}, killing it");
            if let Err(e) = child.start_kill() {
                warn!("Failed to kill unresponsive updater: {e}");
            }
            return Err(Error::Handshake(format!(
                "updater not ready after {timeout:?}"
            )));
        }

        tokio::time::sleep(delay.min(deadline - now)).await;
        delay = (delay * 2).min(POLL_MAX);
    }
}
