//! Transport errors

use thiserror::Error;

/// Errors that can occur on the serial CAN transport.
///
/// `Send` is the only recoverable kind: the handle stays usable and the
/// caller may continue with the next frame. Everything else either
/// rejects the operation outright (`NotOpen`, `Closed`, `AlreadyOpen`,
/// `Open`) or invalidates the handle (`Fatal`).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Operation on a handle that was never opened
    #[error("transport not open")]
    NotOpen,

    /// Operation on a handle invalidated by a fatal error or shutdown
    #[error("transport closed")]
    Closed,

    /// `open` on a handle that is already open
    #[error("transport already open")]
    AlreadyOpen,

    /// Failed to open the serial port or bring up the CAN channel.
    /// No side effects; the caller may retry or abort.
    #[error("failed to open {port}: {reason}")]
    Open {
        /// Serial port identifier
        port: String,
        /// Underlying failure
        reason: String,
    },

    /// Recoverable I/O hiccup; the connection is presumed still alive
    #[error("send failed: {0}")]
    Send(String),

    /// Unrecoverable transport failure; the handle is now closed
    #[error("transport failure: {0}")]
    Fatal(String),
}

impl TransportError {
    /// Whether this error terminates a replay run.
    ///
    /// `NotOpen` and `Closed` count as fatal from the driver's point of
    /// view: the handle cannot carry any further frame.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            TransportError::Fatal(_) | TransportError::Closed | TransportError::NotOpen
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(TransportError::Fatal("gone".into()).is_fatal());
        assert!(TransportError::Closed.is_fatal());
        assert!(TransportError::NotOpen.is_fatal());
        assert!(!TransportError::Send("overrun".into()).is_fatal());
        assert!(!TransportError::Open {
            port: "/dev/ttyACM0".into(),
            reason: "busy".into()
        }
        .is_fatal());
    }
}
