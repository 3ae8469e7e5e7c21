//! End-to-end replay driver tests against a recording mock transport.

use std::io::Cursor;
use std::time::{Duration, Instant};

use canreplay_core::log::HEADER_LINES;
use canreplay_core::replay::{CancelToken, ReplayDriver, ReplayError, ReplayOutcome, OVERHEAD};
use canreplay_core::transport::{FrameSink, TransportError};

/// Mock transport recording every call with its wall-clock instant.
struct MockSink {
    sent: Vec<(u32, Vec<u8>, Instant)>,
    opens: usize,
    closes: usize,
    fail_open: bool,
    /// 1-based send index that fails fatally
    fatal_on_send: Option<usize>,
    /// 1-based send index that fails recoverably
    reject_on_send: Option<usize>,
    attempted: usize,
}

impl MockSink {
    fn new() -> Self {
        Self {
            sent: Vec::new(),
            opens: 0,
            closes: 0,
            fail_open: false,
            fatal_on_send: None,
            reject_on_send: None,
            attempted: 0,
        }
    }

    fn sent_ids(&self) -> Vec<u32> {
        self.sent.iter().map(|(id, _, _)| *id).collect()
    }
}

impl FrameSink for MockSink {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.fail_open {
            return Err(TransportError::Open {
                port: "/dev/ttyACM9".into(),
                reason: "No such file or directory".into(),
            });
        }
        self.opens += 1;
        Ok(())
    }

    fn send(
        &mut self,
        record: &canreplay_core::log::LogRecord,
    ) -> Result<(), TransportError> {
        self.attempted += 1;
        if self.fatal_on_send == Some(self.attempted) {
            return Err(TransportError::Fatal("device disappeared".into()));
        }
        if self.reject_on_send == Some(self.attempted) {
            return Err(TransportError::Send("adapter overrun".into()));
        }
        self.sent
            .push((record.arbitration_id, record.data.clone(), Instant::now()));
        Ok(())
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

/// Build a log: 8 preamble lines then one row per (time, id, data).
fn log_with_rows(rows: &[&str]) -> Cursor<String> {
    let mut body = String::new();
    for _ in 0..HEADER_LINES {
        body.push_str("preamble\n");
    }
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    Cursor::new(body)
}

fn row(time: f64, id: u32, data: &[u8]) -> String {
    let mut fields = vec![
        format!("{:.6}", time),
        "0".to_string(),
        format!("{:X}", id),
        "0".to_string(),
        format!("{:X}", data.len()),
    ];
    for i in 0..8 {
        fields.push(
            data.get(i)
                .map(|b| format!("{:02X}", b))
                .unwrap_or_default(),
        );
    }
    fields.push("1".to_string());
    fields.push("2023-10-01".to_string());
    fields.join(",")
}

#[test]
fn sends_in_row_order_with_paced_gaps() {
    let rows = [
        row(0.0, 0x123, &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
        row(0.25, 0x200, &[0xAA]),
        row(0.30, 0x300, &[0xBB]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::Completed);
    assert_eq!(summary.frames_sent, 3);
    assert_eq!(summary.frames_rejected, 0);
    assert_eq!(sink.sent_ids(), vec![0x123, 0x200, 0x300]);
    assert_eq!(sink.closes, 1);

    // Measured gap between sends tracks the log gap minus OVERHEAD.
    // Generous upper tolerance: CI schedulers oversleep, never undersleep.
    let gap = sink.sent[1].2 - sink.sent[0].2;
    let expected = Duration::from_millis(250) - OVERHEAD;
    assert!(gap >= expected, "gap {:?} shorter than {:?}", gap, expected);
    assert!(
        gap <= expected + Duration::from_millis(100),
        "gap {:?} far beyond {:?}",
        gap,
        expected
    );
}

#[test]
fn identical_timestamps_produce_zero_wait() {
    let rows = [
        row(1.0, 0x100, &[0x01]),
        row(1.0, 0x101, &[0x02]),
        row(1.0, 0x102, &[0x03]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    let start = Instant::now();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.frames_sent, 3);
    assert!(
        start.elapsed() < Duration::from_millis(100),
        "zero-gap rows should not stall"
    );
}

#[test]
fn malformed_row_is_skipped_without_send() {
    let rows = [
        row(0.0, 0x100, &[0x01]),
        "0.1,0,123,0,2,FF,GG,,,,,,,1,2023-10-01".to_string(), // non-hex byte
        row(0.01, 0x102, &[0x03]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.frames_sent, 2);
    assert_eq!(summary.frames_rejected, 1);
    assert_eq!(sink.sent_ids(), vec![0x100, 0x102]);
}

#[test]
fn garbage_timestamps_are_skipped_not_fatal() {
    // "inf", "nan", and absurd magnitudes all parse as f64; none may
    // reach the pacing arithmetic or stall the stream.
    let rows = [
        row(0.0, 0x100, &[0x01]),
        "inf,0,123,0,1,FF,,,,,,,,1,2023-10-01".to_string(),
        "nan,0,123,0,1,FF,,,,,,,,1,2023-10-01".to_string(),
        "1e30,0,123,0,1,FF,,,,,,,,1,2023-10-01".to_string(),
        row(0.001, 0x104, &[0x05]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    let start = Instant::now();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::Completed);
    assert_eq!(summary.frames_sent, 2);
    assert_eq!(summary.frames_rejected, 3);
    assert_eq!(sink.sent_ids(), vec![0x100, 0x104]);
    assert_eq!(sink.closes, 1);
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "garbage gaps must not be waited out, took {:?}",
        start.elapsed()
    );
}

#[test]
fn oversized_row_is_rejected_never_truncated() {
    let rows = [
        row(0.0, 0x100, &[0x01]),
        // 12 populated data fields: CAN-FD export row
        "0.1,0,123,0,C,01,02,03,04,05,06,07,08,09,0A,0B,0C,1,2023-10-01".to_string(),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.frames_sent, 1);
    assert_eq!(summary.frames_rejected, 1);
    // No truncated 8-byte ghost of the FD frame went out
    assert_eq!(sink.sent_ids(), vec![0x100]);
}

#[test]
fn recoverable_send_error_continues_stream() {
    let rows = [
        row(0.0, 0x100, &[0x01]),
        row(0.001, 0x101, &[0x02]),
        row(0.002, 0x102, &[0x03]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    sink.reject_on_send = Some(2);
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::Completed);
    assert_eq!(summary.frames_sent, 2);
    assert_eq!(summary.frames_rejected, 1);
    assert_eq!(sink.sent_ids(), vec![0x100, 0x102]);
    assert_eq!(sink.closes, 1);
}

#[test]
fn fatal_send_error_aborts_with_partial_counts() {
    let rows = [
        row(0.0, 0x100, &[0x01]),
        row(0.001, 0x101, &[0x02]),
        row(0.002, 0x102, &[0x03]),
        row(0.003, 0x103, &[0x04]),
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    sink.fatal_on_send = Some(3);
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::TransportFailed);
    assert!(!summary.succeeded());
    // Exactly the sends before the fatal one
    assert_eq!(summary.frames_sent, 2);
    assert_eq!(sink.sent_ids(), vec![0x100, 0x101]);
    // Close invoked exactly once on the abort path
    assert_eq!(sink.closes, 1);
}

#[test]
fn open_failure_reports_before_any_send() {
    let rows = [row(0.0, 0x100, &[0x01])];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let mut sink = MockSink::new();
    sink.fail_open = true;
    let err = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&refs))
        .unwrap_err();

    assert!(matches!(
        err,
        ReplayError::Open(TransportError::Open { .. })
    ));
    assert_eq!(sink.attempted, 0);
    assert!(sink.sent.is_empty());
}

#[test]
fn cancellation_interrupts_the_pacing_wait() {
    let rows = [
        row(0.0, 0x100, &[0x01]),
        row(5.0, 0x101, &[0x02]), // five-second gap the wait must not serve out
    ];
    let refs: Vec<&str> = rows.iter().map(String::as_str).collect();

    let cancel = CancelToken::new();
    {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        });
    }

    let mut sink = MockSink::new();
    let start = Instant::now();
    let summary = ReplayDriver::new(&mut sink, cancel)
        .run(log_with_rows(&refs))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::Cancelled);
    assert_eq!(summary.frames_sent, 1);
    assert!(
        start.elapsed() < Duration::from_secs(1),
        "cancellation should preempt the wait, took {:?}",
        start.elapsed()
    );
    assert_eq!(sink.closes, 1);
}

#[test]
fn empty_log_drains_cleanly() {
    let mut sink = MockSink::new();
    let summary = ReplayDriver::new(&mut sink, CancelToken::new())
        .run(log_with_rows(&[]))
        .unwrap();

    assert_eq!(summary.outcome, ReplayOutcome::Completed);
    assert_eq!(summary.frames_sent, 0);
    assert_eq!(summary.frames_rejected, 0);
    assert_eq!(sink.closes, 1);
}
