//! Pacing scheduler
//!
//! Computes how long to wait before each send so that elapsed
//! wall-clock time tracks elapsed log time.

use std::time::Duration;

/// Measured per-record cost of decoding and the transmission call.
///
/// Subtracted from each inter-frame gap: that time passes during the
/// interval anyway, and sleeping the full gap would count it twice.
pub const OVERHEAD: Duration = Duration::from_micros(415);

/// Wait to observe before sending the record captured at `current`.
///
/// `previous` is the capture time of the last transmitted record, or
/// `None` for the first one (no wait). The result is `gap - OVERHEAD`
/// when that is positive, otherwise the raw gap clamped at zero: a
/// single catch-up step never introduces extra delay, and a negative
/// sleep is never produced. Two records with identical capture times
/// yield a zero wait deterministically.
///
/// This is best-effort compensation, not a hard real-time guarantee.
/// Cumulative drift across a long file is not corrected beyond this
/// per-step subtraction: each gap is measured only against its
/// predecessor, never against absolute elapsed time.
pub fn wait_before(previous: Option<f64>, current: f64) -> Duration {
    let Some(previous) = previous else {
        return Duration::ZERO;
    };
    let gap = current - previous;
    if gap <= 0.0 {
        return Duration::ZERO;
    }
    // Parser-accepted timestamps are finite and bounded, so every gap
    // between them converts; a non-finite or oversized value reaching
    // this point must not panic the run, and waiting it out is not an
    // option either.
    let Ok(gap) = Duration::try_from_secs_f64(gap) else {
        return Duration::ZERO;
    };
    if gap > OVERHEAD {
        gap - OVERHEAD
    } else {
        gap
    }
}
