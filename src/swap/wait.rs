//! Bounded wait for the caller process to exit.

use crate::error::{Error, Result};
use std::time::Duration;
use sysinfo::{Pid, ProcessStatus, System};
use tokio::time::Instant;
use tracing::debug;

/// Observes whether a process is still running.
pub trait ProcessProbe: Send + Sync {
    /// `true` while `pid` refers to a live process.
    fn is_alive(&mut self, pid: u32) -> bool;
}

/// [`ProcessProbe`] backed by the OS process table.
pub struct SysinfoProbe {
    system: System,
}

impl SysinfoProbe {
    /// Create a probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn is_alive(&mut self, pid: u32) -> bool {
        let pid = Pid::from_u32(pid);
        if !self.system.refresh_process(pid) {
            return false;
        }
        // An exited child that has not been reaped yet is not running.
        self.system
            .process(pid)
            .is_some_and(|p| !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead))
    }
}

/// Backoff schedule for [`wait_for_exit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Give up after this long.
    pub timeout: Duration,
    /// First poll interval.
    pub initial_delay: Duration,
    /// Poll interval cap.
    pub max_delay: Duration,
}

impl WaitPolicy {
    /// Default backoff with the given bound.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_secs(1),
        }
    }
}

/// Wait until `pid` has exited.
///
/// # Errors
///
/// Returns [`Error::WaitTimeout`] if the process is still alive when the
/// policy's timeout passes.
pub async fn wait_for_exit(
    probe: &mut dyn ProcessProbe,
    pid: u32,
    policy: WaitPolicy,
) -> Result<Duration> {
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut delay = policy.initial_delay;

    loop {
        if !probe.is_alive(pid) {
            let waited = started.elapsed();
            debug!("Process {pid} exited after {waited:?}");
            return Ok(waited);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(Error::WaitTimeout {
                pid,
                waited: started.elapsed(),
            });
        }

        tokio::time::sleep(delay.min(deadline - now)).await;
        delay = (delay * 2).min(policy.max_delay);
    }
}
