//! Transport adapter
//!
//! Owns the SLCAN serial handle and its open/closed lifecycle.

use serialport::SerialPort;
use std::io::{self, Write};
use std::time::Duration;

use tracing::{debug, info, trace};

use super::serial::{clear_buffers, configure_port, open_port};
use super::{slcan, TransportError, DEFAULT_BAUD_RATE, DEFAULT_BITRATE, DEFAULT_TIMEOUT_MS};
use crate::log::LogRecord;

/// Transport configuration
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Serial port name
    pub port_name: String,
    /// Serial baud rate
    pub baud_rate: u32,
    /// CAN bus bitrate
    pub bitrate: u32,
    /// Serial operation timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            bitrate: DEFAULT_BITRATE,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Seam between the replay driver and the wire.
///
/// `close` is infallible and idempotent: calling it on a handle that
/// never opened, or a second time, is a no-op.
pub trait FrameSink {
    /// Bring up the CAN channel. No side effects on failure.
    fn open(&mut self) -> Result<(), TransportError>;

    /// Transmit one frame.
    fn send(&mut self, record: &LogRecord) -> Result<(), TransportError>;

    /// Release the channel and the underlying device.
    fn close(&mut self);
}

impl<T: FrameSink + ?Sized> FrameSink for &mut T {
    fn open(&mut self) -> Result<(), TransportError> {
        (**self).open()
    }

    fn send(&mut self, record: &LogRecord) -> Result<(), TransportError> {
        (**self).send(record)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Explicit handle lifecycle. A handle invalidated by a fatal error or
/// an explicit close never touches the device again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandleState {
    NeverOpened,
    Open,
    Invalidated,
}

/// SLCAN adapter connection over a serial port.
pub struct SlcanTransport {
    /// Serial port handle, present only while open
    port: Option<Box<dyn SerialPort>>,
    state: HandleState,
    config: TransportConfig,
}

impl SlcanTransport {
    /// Create a transport (not yet opened).
    pub fn new(config: TransportConfig) -> Self {
        Self {
            port: None,
            state: HandleState::NeverOpened,
            config,
        }
    }

    /// Whether the channel is currently open.
    pub fn is_open(&self) -> bool {
        self.state == HandleState::Open
    }

    fn invalidate(&mut self) {
        self.port = None;
        self.state = HandleState::Invalidated;
    }
}

/// Recoverable I/O hiccups keep the handle alive; anything else means
/// the device is gone.
fn classify_send_error(e: io::Error) -> TransportError {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted => {
            TransportError::Send(e.to_string())
        }
        _ => TransportError::Fatal(e.to_string()),
    }
}

impl FrameSink for SlcanTransport {
    fn open(&mut self) -> Result<(), TransportError> {
        if self.state == HandleState::Open {
            return Err(TransportError::AlreadyOpen);
        }

        let code = slcan::bitrate_code(self.config.bitrate).ok_or_else(|| {
            TransportError::Open {
                port: self.config.port_name.clone(),
                reason: format!("unsupported CAN bitrate {}", self.config.bitrate),
            }
        })?;

        let mut port = open_port(
            &self.config.port_name,
            self.config.baud_rate,
            Duration::from_millis(self.config.timeout_ms),
        )?;
        configure_port(port.as_mut())?;
        clear_buffers(port.as_mut())?;

        // Channel bring-up: close any stale channel, set bitrate, open.
        let open_io_err = |e: io::Error| TransportError::Open {
            port: self.config.port_name.clone(),
            reason: e.to_string(),
        };
        port.write_all(slcan::CMD_CLOSE).map_err(open_io_err)?;
        port.write_all(&slcan::bitrate_command(code))
            .map_err(open_io_err)?;
        port.write_all(slcan::CMD_OPEN).map_err(open_io_err)?;

        info!(
            port = %self.config.port_name,
            bitrate = self.config.bitrate,
            "CAN channel open"
        );
        self.port = Some(port);
        self.state = HandleState::Open;
        Ok(())
    }

    fn send(&mut self, record: &LogRecord) -> Result<(), TransportError> {
        let port = match self.state {
            HandleState::NeverOpened => return Err(TransportError::NotOpen),
            HandleState::Invalidated => return Err(TransportError::Closed),
            HandleState::Open => self.port.as_mut().ok_or(TransportError::Closed)?,
        };

        let frame = slcan::encode_frame(record);
        match port.write_all(&frame) {
            Ok(()) => {
                trace!(id = record.arbitration_id, dlc = record.dlc(), "frame sent");
                Ok(())
            }
            Err(e) => {
                let err = classify_send_error(e);
                if err.is_fatal() {
                    debug!(%err, "send failed fatally, invalidating handle");
                    self.invalidate();
                }
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        if self.state != HandleState::Open {
            return;
        }
        if let Some(port) = self.port.as_mut() {
            // Best-effort channel close; the device may already be gone.
            let _ = port.write_all(slcan::CMD_CLOSE);
        }
        info!(port = %self.config.port_name, "CAN channel closed");
        self.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> LogRecord {
        LogRecord {
            capture_time: 0.0,
            channel: "0".into(),
            arbitration_id: 0x123,
            data: vec![0x01],
        }
    }

    #[test]
    fn test_send_before_open() {
        let mut transport = SlcanTransport::new(TransportConfig::default());
        assert!(matches!(
            transport.send(&record()),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut transport = SlcanTransport::new(TransportConfig::default());
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }

    #[test]
    fn test_open_rejects_unsupported_bitrate() {
        let mut transport = SlcanTransport::new(TransportConfig {
            port_name: "/dev/null".into(),
            bitrate: 300_000,
            ..Default::default()
        });
        let err = transport.open().unwrap_err();
        assert!(matches!(err, TransportError::Open { .. }));
        assert!(!transport.is_open());
    }

    #[test]
    fn test_open_missing_device() {
        let mut transport = SlcanTransport::new(TransportConfig {
            port_name: "/dev/definitely-not-a-port".into(),
            ..Default::default()
        });
        assert!(matches!(
            transport.open(),
            Err(TransportError::Open { .. })
        ));
        // Failure has no side effects
        assert!(matches!(
            transport.send(&record()),
            Err(TransportError::NotOpen)
        ));
    }
}
