//! Swap executor: the updater side of the handoff.
//!
//! Runs in its own process, started by the launcher with the arguments built
//! in [`crate::handoff::HandoffCommand`]:
//!
//! 1. Signal readiness through the marker file
//! 2. Wait (bounded) for the launcher process to exit
//! 3. Install the staged file over the destination
//! 4. Start the destination
//!
//! A timeout in step 2 leaves both files untouched. A failure in step 3
//! leaves the staged file in place for manual recovery.

mod strategy;
mod wait;

pub use strategy::{PlatformSwapper, RenameOverOpen, ReplaceAfterExit, Swapper};
pub use wait::{wait_for_exit, ProcessProbe, SysinfoProbe, WaitPolicy};

use crate::error::{Error, Result};
use crate::handoff::ready;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;
use tracing::{error, info, warn};

/// Process exit codes of the swap executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SwapExitCode {
    /// Destination replaced and relaunched.
    Success = 0,
    /// Invalid arguments.
    Usage = 1,
    /// The launcher never exited.
    WaitTimeout = 2,
    /// The destination could not be replaced.
    SwapFailed = 3,
    /// The new executable could not be started.
    RelaunchFailed = 4,
}

impl SwapExitCode {
    /// Numeric process exit code.
    #[must_use]
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<SwapExitCode> for std::process::ExitCode {
    fn from(code: SwapExitCode) -> Self {
        Self::from(code.code())
    }
}

/// One swap job, as received on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    /// Launcher process to wait for.
    pub pid: u32,
    /// Staged replacement.
    pub source: PathBuf,
    /// Executable to replace and start.
    pub destination: PathBuf,
    /// Marker to write once running.
    pub ready_file: Option<PathBuf>,
    /// Bound on the wait for `pid`.
    pub wait_timeout: Duration,
}

/// Starts the installed executable.
pub trait Relauncher: Send + Sync {
    /// Start `destination` detached from this process.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Relaunch`] if the process cannot be started.
    fn relaunch(&self, destination: &Path) -> Result<()>;
}

/// Starts the destination with no arguments in its own directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnRelauncher;

impl Relauncher for SpawnRelauncher {
    fn relaunch(&self, destination: &Path) -> Result<()> {
        let mut cmd = Command::new(destination);
        if let Some(dir) = destination.parent().filter(|d| !d.as_os_str().is_empty()) {
            cmd.current_dir(dir);
        }
        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Relaunch(format!("{}: {e}", destination.display())))?;
        info!("Relaunched {} as {}", destination.display(), child.id());
        Ok(())
    }
}

/// Drives a [`SwapRequest`] to completion.
pub struct SwapExecutor {
    probe: Box<dyn ProcessProbe>,
    swapper: Box<dyn Swapper>,
    relauncher: Box<dyn Relauncher>,
}

impl Default for SwapExecutor {
    fn default() -> Self {
        Self::new(
            Box::new(SysinfoProbe::new()),
            Box::new(PlatformSwapper::default()),
            Box::new(SpawnRelauncher),
        )
    }
}

impl SwapExecutor {
    /// Assemble an executor from its parts.
    #[must_use]
    pub fn new(
        probe: Box<dyn ProcessProbe>,
        swapper: Box<dyn Swapper>,
        relauncher: Box<dyn Relauncher>,
    ) -> Self {
        Self {
            probe,
            swapper,
            relauncher,
        }
    }

    /// Run the request and map the result onto an exit code.
    pub async fn run(&mut self, request: &SwapRequest) -> SwapExitCode {
        match self.execute(request).await {
            Ok(()) => SwapExitCode::Success,
            Err(e) => {
                error!("Swap aborted: {e}");
                match e {
                    Error::WaitTimeout { .. } => SwapExitCode::WaitTimeout,
                    Error::Relaunch(_) => SwapExitCode::RelaunchFailed,
                    _ => SwapExitCode::SwapFailed,
                }
            }
        }
    }

    /// Run the request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaitTimeout`], [`Error::Swap`] or [`Error::Relaunch`]
    /// for the step that failed.
    pub async fn execute(&mut self, request: &SwapRequest) -> Result<()> {
        if let Some(marker) = &request.ready_file {
            // The launcher keeps running if this fails, so it is not fatal.
            if let Err(e) = ready::signal_ready(marker) {
                warn!("Could not write ready marker {}: {e}", marker.display());
            }
        }

        info!(
            "Waiting up to {:?} for process {} to exit",
            request.wait_timeout, request.pid
        );
        wait_for_exit(
            self.probe.as_mut(),
            request.pid,
            WaitPolicy::with_timeout(request.wait_timeout),
        )
        .await?;

        if let Some(marker) = &request.ready_file {
            match std::fs::remove_file(marker) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Could not remove ready marker {}: {e}", marker.display()),
            }
        }

        info!(
            "Installing {} over {} ({})",
            request.source.display(),
            request.destination.display(),
            self.swapper.name()
        );
        self.swapper.install(&request.source, &request.destination)?;
        self.relauncher.relaunch(&request.destination)
    }
}
