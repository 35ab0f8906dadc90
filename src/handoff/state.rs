//! Handoff state machine.

/// Progress of one update cycle.
///
/// ```text
/// Idle ─▶ CheckingVersion ─▶ AwaitingConsent ─▶ Downloading ─▶ Staged ─▶ HandoffLaunched ─▶ CallerExited
///              │                   │                 │            │            │
///              └──────▶ Failed ◀───┼─────────────────┴────────────┴────────────┘
///                                  └──▶ Idle (declined)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandoffState {
    /// No cycle running.
    #[default]
    Idle,
    /// Querying the release feed.
    CheckingVersion,
    /// Waiting for the user to accept or decline.
    AwaitingConsent,
    /// Fetching the asset.
    Downloading,
    /// Asset on disk, updater not yet started.
    Staged,
    /// Updater spawned; this process is committed to exiting.
    HandoffLaunched,
    /// Terminal: this process is exiting.
    CallerExited,
    /// The last cycle failed; the application keeps running.
    Failed,
}

impl HandoffState {
    /// Whether `next` is a legal successor of `self`.
    ///
    /// Returning to `Idle` from an in-progress state covers both a negative
    /// result (no update, declined) and cancellation before the handoff.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        use HandoffState::{
            AwaitingConsent, CallerExited, CheckingVersion, Downloading, Failed, HandoffLaunched,
            Idle, Staged,
        };

        matches!(
            (self, next),
            (Idle | Failed, CheckingVersion)
                | (CheckingVersion, AwaitingConsent | Idle | Failed)
                | (AwaitingConsent, Downloading | Idle)
                | (Downloading | Staged, Idle | Failed)
                | (Downloading, Staged)
                | (Staged, HandoffLaunched)
                | (HandoffLaunched, CallerExited | Failed)
        )
    }

    /// Whether a new cycle may start from this state.
    #[must_use]
    pub fn accepts_new_cycle(self) -> bool {
        matches!(self, Self::Idle | Self::Failed)
    }
}
