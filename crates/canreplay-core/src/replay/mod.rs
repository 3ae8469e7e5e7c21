//! Replay Engine
//!
//! Sequences parser, pacing scheduler, and transport over the lifetime
//! of one log file.

mod driver;
mod pacing;

pub use driver::{DriverState, ReplayDriver, ReplayError};
pub use pacing::{wait_before, OVERHEAD};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared between the replay thread and
/// whoever observes the operator interrupt.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Irrevocable for the current run.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// How a replay run terminated.
///
/// Cancellation is a first-class outcome, not an error, and is kept
/// distinct from transport fatality so the operator can tell an
/// interrupt from a dead adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayOutcome {
    /// Log fully consumed, transport drained
    Completed,
    /// Operator interrupt observed mid-run
    Cancelled,
    /// Unrecoverable transport failure mid-run
    TransportFailed,
}

impl fmt::Display for ReplayOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayOutcome::Completed => write!(f, "completed"),
            ReplayOutcome::Cancelled => write!(f, "cancelled"),
            ReplayOutcome::TransportFailed => write!(f, "transport failure"),
        }
    }
}

/// End-of-run report. Always carries both counters, whatever the
/// termination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaySummary {
    /// Frames successfully handed to the bus
    pub frames_sent: u64,
    /// Records rejected at parse time or by a recoverable send error
    pub frames_rejected: u64,
    /// Termination reason
    pub outcome: ReplayOutcome,
}

impl ReplaySummary {
    /// Whether the run drained the whole log.
    pub fn succeeded(&self) -> bool {
        self.outcome == ReplayOutcome::Completed
    }
}
