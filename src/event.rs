//! Update progress events.

use std::path::PathBuf;
use tokio::sync::broadcast;

/// Events emitted during an update cycle.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    /// A release check started.
    CheckStarted,

    /// The running version is current (or no installable asset exists).
    UpToDate,

    /// An installable update was found.
    UpdateAvailable {
        /// Remote version tag.
        version: String,
        /// Selected asset file name.
        asset: String,
    },

    /// The user declined the update.
    Declined,

    /// Asset download started.
    DownloadStarted {
        /// Asset URL.
        url: String,
    },

    /// Asset staged on disk.
    Staged {
        /// Staged file.
        path: PathBuf,
        /// Staged size in bytes.
        bytes: u64,
    },

    /// Updater spawned and confirmed ready.
    HandoffLaunched {
        /// Updater process id.
        updater_pid: u32,
    },

    /// The cycle failed.
    Failed {
        /// Error message.
        message: String,
    },
}

/// Channel for receiving update events.
pub type UpdateEventsChannel = broadcast::Receiver<UpdateEvent>;

/// Sender for update events.
pub type UpdateEventsSender = broadcast::Sender<UpdateEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (UpdateEventsSender, UpdateEventsChannel) {
    broadcast::channel(64)
}
