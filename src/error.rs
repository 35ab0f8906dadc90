//! Error types for launcher-update.

use crate::handoff::HandoffState;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the update pipeline.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Release feed could not be reached or answered with a failure status.
    #[error("Network error: {0}")]
    Network(String),

    /// Release feed answered with a body we cannot use.
    #[error("Malformed release feed: {0}")]
    Feed(String),

    /// Asset download failed.
    #[error("Download failed: {0}")]
    Download(String),

    /// The updater executable does not exist.
    #[error("Updater executable not found: {}", .0.display())]
    UpdaterMissing(PathBuf),

    /// The updater process could not be started.
    #[error("Failed to start updater: {0}")]
    Spawn(String),

    /// The updater started but never confirmed it was ready.
    #[error("Updater handshake failed: {0}")]
    Handshake(String),

    /// The Launch Monitor did not allow the application to exit in time.
    #[error("Application was not ready to exit within {0:?}")]
    ExitBlocked(Duration),

    /// Another update cycle is in progress or a handoff was already launched.
    #[error("An update handoff is already pending")]
    HandoffPending,

    /// Illegal state machine transition.
    #[error("Invalid handoff transition: {from:?} -> {to:?}")]
    InvalidTransition {
        /// State before the attempted transition.
        from: HandoffState,
        /// Requested state.
        to: HandoffState,
    },

    /// The caller process did not exit in time.
    #[error("Process {pid} still running after {waited:?}")]
    WaitTimeout {
        /// Process being waited on.
        pid: u32,
        /// Time spent waiting.
        waited: Duration,
    },

    /// Installing the staged file over the destination failed.
    #[error("Swap failed: {0}")]
    Swap(String),

    /// The installed executable could not be started.
    #[error("Relaunch failed: {0}")]
    Relaunch(String),
}

/// Result type for launcher-update operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Feed(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
