//! Handoff coordination: consent, staging, and the two-process exit.
//!
//! The coordinator drives one update cycle at a time through
//! [`HandoffState`]. Only one cycle may run per process, and once a handoff
//! has been launched no further cycle is accepted because the destination
//! executable is about to be replaced.

mod entry;
mod plan;
pub mod ready;
mod state;

pub use entry::{EntryPoint, HOST_ENV, UPDATER_STEM};
pub use plan::{
    quote_arg, HandoffCommand, UpdatePlan, ARG_DST, ARG_PID, ARG_READY_FILE, ARG_SRC,
    ARG_WAIT_TIMEOUT,
};
pub use state::HandoffState;

use crate::config::{HandoffConfig, UpdaterConfig};
use crate::download::{Downloader, StagedAsset};
use crate::error::{Error, Result};
use crate::event::{create_event_channel, UpdateEvent, UpdateEventsChannel, UpdateEventsSender};
use crate::release::{AvailableUpdate, ReleaseChecker};
use crate::CURRENT_VERSION;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{error, info, warn};

const SAFE_TO_EXIT_POLL: Duration = Duration::from_millis(250);

/// The host application's side of the update flow.
///
/// Implemented by whatever owns the user interface and the game launch
/// engine. Methods are called from a blocking context and may block.
pub trait LaunchMonitor: Send + Sync {
    /// Ask the user whether to install `update`. `true` means proceed.
    fn offer_update(&self, update: &AvailableUpdate) -> bool;

    /// Whether the application may exit now (no launch sequence running,
    /// state persisted).
    fn safe_to_exit(&self) -> bool {
        true
    }

    /// Show a blocking error notification.
    fn report_error(&self, error: &Error);
}

/// How a cycle ended without error.
#[derive(Debug)]
pub enum CycleOutcome {
    /// No installable update.
    UpToDate,
    /// The user declined.
    Declined,
    /// Cancelled before the handoff.
    Cancelled,
    /// The updater is running and waiting; the caller must exit now.
    ExitRequired(LaunchedHandoff),
}

/// A launched updater waiting for this process to exit.
#[derive(Debug)]
pub struct LaunchedHandoff {
    plan: UpdatePlan,
    updater_pid: u32,
    state: Arc<Mutex<HandoffState>>,
}

impl LaunchedHandoff {
    /// The plan the updater received.
    #[must_use]
    pub fn plan(&self) -> &UpdatePlan {
        &self.plan
    }

    /// Process id the updater reported in its ready marker.
    #[must_use]
    pub fn updater_pid(&self) -> u32 {
        self.updater_pid
    }

    /// Mark the caller as exited without terminating the process.
    pub fn commit(&self) {
        let mut state = self.state.lock();
        if state.can_transition_to(HandoffState::CallerExited) {
            *state = HandoffState::CallerExited;
        }
    }

    /// Terminate this process so the updater can replace the destination.
    pub fn exit(self) -> ! {
        self.commit();
        info!(
            "Exiting for update; updater {} will replace {}",
            self.updater_pid,
            self.plan.destination_path.display()
        );
        std::process::exit(0)
    }
}

/// Runs update cycles for one process.
pub struct HandoffCoordinator {
    checker: ReleaseChecker,
    downloader: Downloader,
    entry: EntryPoint,
    updater_path: PathBuf,
    settings: HandoffConfig,
    current_version: String,
    monitor: Arc<dyn LaunchMonitor>,
    state: Arc<Mutex<HandoffState>>,
    events_tx: UpdateEventsSender,
}

impl HandoffCoordinator {
    /// Create a coordinator.
    ///
    /// `entry` must be resolved once at startup and passed in; it decides
    /// which executable is replaced and relaunched.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub fn new(
        config: &UpdaterConfig,
        entry: EntryPoint,
        monitor: Arc<dyn LaunchMonitor>,
    ) -> Result<Self> {
        let checker = ReleaseChecker::new(&config.feed)?;
        let downloader = Downloader::new(&config.download, &config.feed.user_agent)?;
        let updater_path = config
            .handoff
            .updater_path
            .clone()
            .unwrap_or_else(|| entry.default_updater_path());
        let (events_tx, _) = create_event_channel();

        Ok(Self {
            checker,
            downloader,
            entry,
            updater_path,
            settings: config.handoff.clone(),
            current_version: CURRENT_VERSION.to_string(),
            monitor,
            state: Arc::new(Mutex::new(HandoffState::Idle)),
            events_tx,
        })
    }

    /// Compare against `version` instead of the built-in version.
    #[must_use]
    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> HandoffState {
        *self.state.lock()
    }

    /// Resolved entry point.
    #[must_use]
    pub fn entry(&self) -> &EntryPoint {
        &self.entry
    }

    /// Updater executable that will be spawned.
    #[must_use]
    pub fn updater_path(&self) -> &PathBuf {
        &self.updater_path
    }

    /// Subscribe to progress events.
    #[must_use]
    pub fn subscribe_events(&self) -> UpdateEventsChannel {
        self.events_tx.subscribe()
    }

    /// Check the feed only, without touching the state machine.
    pub async fn check(&self) -> Option<AvailableUpdate> {
        self.checker.check_for_update(&self.current_version).await
    }

    /// Run one update cycle.
    ///
    /// `cancel` is honored until the updater has been spawned. Failures
    /// after the check are reported to the [`LaunchMonitor`] before being
    /// returned; the process is left running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HandoffPending`] if another cycle is active or a
    /// handoff was already launched, and the download or handoff error
    /// otherwise.
    pub async fn run_cycle(&self, mut cancel: watch::Receiver<bool>) -> Result<CycleOutcome> {
        let _cycle = self.begin_cycle()?;
        let _ = self.events_tx.send(UpdateEvent::CheckStarted);

        let update = tokio::select! {
            biased;
            () = cancelled(&mut cancel) => return self.cancel_cycle(),
            update = self.checker.check_for_update(&self.current_version) => update,
        };

        let Some(update) = update else {
            self.transition(HandoffState::Idle)?;
            let _ = self.events_tx.send(UpdateEvent::UpToDate);
            return Ok(CycleOutcome::UpToDate);
        };

        self.transition(HandoffState::AwaitingConsent)?;
        let _ = self.events_tx.send(UpdateEvent::UpdateAvailable {
            version: update.release.version.clone(),
            asset: update.asset.file_name.clone(),
        });

        let monitor = Arc::clone(&self.monitor);
        let offered = update.clone();
        let consent = tokio::select! {
            biased;
            () = cancelled(&mut cancel) => return self.cancel_cycle(),
            consent = tokio::task::spawn_blocking(move || monitor.offer_update(&offered)) => consent,
        };

        let accepted = consent.unwrap_or_else(|e| {
            warn!("Consent prompt failed: {e}");
            false
        });
        if !accepted {
            info!("Update to {} declined", update.release.version);
            self.transition(HandoffState::Idle)?;
            let _ = self.events_tx.send(UpdateEvent::Declined);
            return Ok(CycleOutcome::Declined);
        }

        self.transition(HandoffState::Downloading)?;
        let _ = self.events_tx.send(UpdateEvent::DownloadStarted {
            url: update.asset.download_url.clone(),
        });

        let staged = tokio::select! {
            biased;
            () = cancelled(&mut cancel) => return self.cancel_cycle(),
            staged = self.downloader.download(&update.asset) => staged,
        };
        let staged = match staged {
            Ok(staged) => staged,
            Err(e) => return Err(self.fail(e)),
        };

        self.transition(HandoffState::Staged)?;
        let _ = self.events_tx.send(UpdateEvent::Staged {
            path: staged.path.clone(),
            bytes: staged.bytes,
        });

        match self.wait_until_safe_to_exit(&mut cancel).await {
            Ok(true) => {}
            Ok(false) => return self.cancel_cycle(),
            Err(e) => return Err(self.fail(e)),
        }

        match self.launch(&staged).await {
            Ok(handoff) => Ok(CycleOutcome::ExitRequired(handoff)),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Spawn the updater and wait for its ready marker.
    async fn launch(&self, staged: &StagedAsset) -> Result<LaunchedHandoff> {
        let plan = UpdatePlan {
            staged_path: staged.path.clone(),
            destination_path: self.entry.destination().to_path_buf(),
            updater_path: self.updater_path.clone(),
            caller_pid: std::process::id(),
        };

        if !plan.updater_path.is_file() {
            return Err(Error::UpdaterMissing(plan.updater_path));
        }

        let marker = ready::marker_path(&plan.staged_path);
        ready::clear_marker(&marker).await?;

        let command = HandoffCommand::new(
            &plan,
            &marker,
            Duration::from_secs(self.settings.wait_timeout_secs),
        );
        info!("Starting updater: {}", command.display());

        let mut child = command
            .to_command()
            .spawn()
            .map_err(|e| Error::Spawn(format!("{}: {e}", plan.updater_path.display())))?;

        self.transition(HandoffState::HandoffLaunched)?;

        let updater_pid = ready::wait_for_ready(
            &mut child,
            &marker,
            Duration::from_secs(self.settings.ready_timeout_secs),
        )
        .await?;

        let _ = self
            .events_tx
            .send(UpdateEvent::HandoffLaunched { updater_pid });
        info!("Updater {updater_pid} ready; handing off");

        Ok(LaunchedHandoff {
            plan,
            updater_pid,
            state: Arc::clone(&self.state),
        })
    }

    /// Poll the Launch Monitor until exiting is allowed.
    ///
    /// `Ok(false)` means the cycle was cancelled while waiting.
    async fn wait_until_safe_to_exit(&self, cancel: &mut watch::Receiver<bool>) -> Result<bool> {
        let limit = Duration::from_secs(self.settings.exit_wait_secs);
        let deadline = Instant::now() + limit;

        loop {
            let monitor = Arc::clone(&self.monitor);
            let safe = tokio::task::spawn_blocking(move || monitor.safe_to_exit())
                .await
                .unwrap_or(false);
            if safe {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Err(Error::ExitBlocked(limit));
            }

            tokio::select! {
                biased;
                () = cancelled(cancel) => return Ok(false),
                () = tokio::time::sleep(SAFE_TO_EXIT_POLL) => {}
            }
        }
    }

    /// Enter `CheckingVersion` if no cycle is active.
    ///
    /// The returned guard reopens the gate if the cycle is dropped before
    /// it reached a terminal state.
    fn begin_cycle(&self) -> Result<CycleGuard<'_>> {
        let mut state = self.state.lock();
        if !state.accepts_new_cycle() {
            warn!("Update cycle rejected in state {:?}", *state);
            return Err(Error::HandoffPending);
        }
        *state = HandoffState::CheckingVersion;
        Ok(CycleGuard { state: &self.state })
    }

    fn transition(&self, next: HandoffState) -> Result<()> {
        let mut state = self.state.lock();
        if !state.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: *state,
                to: next,
            });
        }
        *state = next;
        Ok(())
    }

    fn cancel_cycle(&self) -> Result<CycleOutcome> {
        info!("Update cycle cancelled");
        self.transition(HandoffState::Idle)?;
        Ok(CycleOutcome::Cancelled)
    }

    /// Move to `Failed`, notify the user, and hand the error back.
    fn fail(&self, err: Error) -> Error {
        error!("Update failed: {err}");
        if let Err(e) = self.transition(HandoffState::Failed) {
            warn!("{e}");
        }
        let _ = self.events_tx.send(UpdateEvent::Failed {
            message: err.to_string(),
        });
        self.monitor.report_error(&err);
        err
    }
}

/// Resets an abandoned cycle to `Idle` when dropped.
struct CycleGuard<'a> {
    state: &'a Mutex<HandoffState>,
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        match *state {
            HandoffState::CheckingVersion
            | HandoffState::AwaitingConsent
            | HandoffState::Downloading
            | HandoffState::Staged => {
                info!("Update cycle abandoned in state {:?}", *state);
                *state = HandoffState::Idle;
            }
            HandoffState::Idle
            | HandoffState::Failed
            | HandoffState::HandoffLaunched
            | HandoffState::CallerExited => {}
        }
    }
}

/// Resolves once `cancel` carries `true`. Never resolves if the sender is
/// dropped without cancelling.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
