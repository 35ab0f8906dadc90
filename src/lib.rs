//! Self-update subsystem for DailyGameLauncher.
//!
//! The running launcher cannot overwrite its own executable image, so an
//! update is completed by a second process:
//!
//! ```text
//! Release Checker ──▶ consent ──▶ Downloader ──▶ Handoff Coordinator
//!                                                     │ spawn + ready handshake
//!                                                     ▼
//!                                     caller exits ──▶ Swap Executor
//!                                                     │ wait, install, relaunch
//!                                                     ▼
//!                                               new launcher instance
//! ```
//!
//! The [`release`], [`download`] and [`handoff`] modules run inside the
//! launcher. The [`swap`] module backs the `launcher-swap` binary.

pub mod config;
pub mod download;
pub mod error;
pub mod event;
pub mod handoff;
pub mod release;
pub mod swap;

pub use config::UpdaterConfig;
pub use download::{Downloader, StagedAsset};
pub use error::{Error, Result};
pub use event::{UpdateEvent, UpdateEventsChannel, UpdateEventsSender};
pub use handoff::{
    CycleOutcome, EntryPoint, HandoffCoordinator, HandoffState, LaunchMonitor, LaunchedHandoff,
    UpdatePlan,
};
pub use release::{AssetDescriptor, AvailableUpdate, ReleaseChecker, ReleaseDescriptor};

/// Version of the running binary, as published in release tags.
pub const CURRENT_VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));
