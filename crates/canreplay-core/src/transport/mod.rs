//! SLCAN Serial Transport
//!
//! Owns the serial connection to an SLCAN-compatible CAN adapter and
//! the ASCII wire protocol used to drive it. The only part of the
//! crate that touches hardware.

mod adapter;
mod error;
pub mod serial;
mod slcan;

pub use adapter::{FrameSink, SlcanTransport, TransportConfig};
pub use error::TransportError;
pub use serial::{list_ports, PortInfo};
pub use slcan::{bitrate_code, encode_frame};

/// Default serial baud rate for SLCAN adapters
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default CAN bus bitrate (matches the vehicle bus the logs came from)
pub const DEFAULT_BITRATE: u32 = 500_000;

/// Default serial write timeout in milliseconds.
///
/// Bounds every `open`/`send`; a stalled adapter surfaces as an error
/// rather than a hang.
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;
