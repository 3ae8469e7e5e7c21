//! Replay driver
//!
//! Drives one replay run: opens the transport, streams records through
//! the pacing scheduler, and shuts down in order on completion, fatal
//! transport error, or cancellation.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use super::{pacing, CancelToken, ReplayOutcome, ReplaySummary};
use crate::log::LogReader;
use crate::transport::FrameSink;
use crate::transport::TransportError;

/// How often the pacing wait polls for cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(10);

/// Driver lifecycle.
///
/// `Idle → Opening → Streaming → (Draining | Aborting) → Closed`.
/// `Draining` is the normal end-of-log path; `Aborting` is reached on
/// fatal transport error or cancellation. Both close the transport
/// exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    /// Before any action
    Idle,
    /// Transport open in progress
    Opening,
    /// Records flowing
    Streaming,
    /// Log consumed, shutting down cleanly
    Draining,
    /// Shutting down after fatal error or cancellation
    Aborting,
    /// Terminal
    Closed,
}

/// Failure before any frame was sent. Everything past a successful
/// open is reported through [`ReplaySummary`] instead.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// The transport could not be opened
    #[error("transport open failed: {0}")]
    Open(#[source] TransportError),
}

/// Cross-record state, owned by the driver and threaded through each
/// step of one run.
#[derive(Debug, Default)]
struct ReplayState {
    previous_log_time: Option<f64>,
    frames_sent: u64,
    frames_rejected: u64,
}

/// Replay driver for one log file.
pub struct ReplayDriver<T: FrameSink> {
    transport: T,
    cancel: CancelToken,
    state: DriverState,
}

impl<T: FrameSink> ReplayDriver<T> {
    /// Create a driver around an unopened transport.
    pub fn new(transport: T, cancel: CancelToken) -> Self {
        Self {
            transport,
            cancel,
            state: DriverState::Idle,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run the replay to completion.
    ///
    /// Returns `Err` only when the transport fails to open; any later
    /// termination (including fatal transport error and cancellation)
    /// produces a summary with partial counts and the reason.
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<ReplaySummary, ReplayError> {
        self.state = DriverState::Opening;
        if let Err(e) = self.transport.open() {
            self.state = DriverState::Closed;
            return Err(ReplayError::Open(e));
        }

        self.state = DriverState::Streaming;
        let mut replay = ReplayState::default();
        let mut outcome = ReplayOutcome::Completed;

        'stream: for (line, parsed) in LogReader::new(reader) {
            if self.cancel.is_cancelled() {
                outcome = ReplayOutcome::Cancelled;
                break 'stream;
            }

            let record = match parsed {
                Ok(record) => record,
                Err(e) => {
                    // Per-record skip: previous_log_time stays untouched
                    replay.frames_rejected += 1;
                    warn!(line, %e, "record rejected");
                    continue;
                }
            };

            let wait = pacing::wait_before(replay.previous_log_time, record.capture_time);
            if !self.sleep_cancellable(wait) {
                outcome = ReplayOutcome::Cancelled;
                break 'stream;
            }

            match self.transport.send(&record) {
                Ok(()) => {
                    replay.frames_sent += 1;
                    replay.previous_log_time = Some(record.capture_time);
                }
                Err(e) if e.is_fatal() => {
                    error!(line, id = record.arbitration_id, %e, "fatal transport error");
                    outcome = ReplayOutcome::TransportFailed;
                    break 'stream;
                }
                Err(e) => {
                    replay.frames_rejected += 1;
                    warn!(line, id = record.arbitration_id, %e, "send failed, continuing");
                }
            }
        }

        self.state = if outcome == ReplayOutcome::Completed {
            DriverState::Draining
        } else {
            DriverState::Aborting
        };
        self.transport.close();
        self.state = DriverState::Closed;

        let summary = ReplaySummary {
            frames_sent: replay.frames_sent,
            frames_rejected: replay.frames_rejected,
            outcome,
        };
        info!(
            sent = summary.frames_sent,
            rejected = summary.frames_rejected,
            outcome = %summary.outcome,
            "replay finished"
        );
        Ok(summary)
    }

    /// Sleep for `wait`, polling the cancellation token in small
    /// slices so an interrupt is observed promptly rather than after
    /// the full wait. Returns false if cancellation was observed.
    fn sleep_cancellable(&self, wait: Duration) -> bool {
        let mut remaining = wait;
        while remaining > Duration::ZERO {
            if self.cancel.is_cancelled() {
                return false;
            }
            let slice = remaining.min(CANCEL_POLL);
            thread::sleep(slice);
            remaining -= slice;
        }
        !self.cancel.is_cancelled()
    }
}
