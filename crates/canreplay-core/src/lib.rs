//! # canreplay Core Library
//!
//! Core functionality for replaying captured CAN bus logs over an
//! SLCAN-compatible serial adapter.
//!
//! This library provides:
//! - Vendor CSV capture log parsing
//! - Original inter-frame timing reproduction (pacing)
//! - SLCAN serial transport with explicit open/closed state
//! - A replay driver that sequences the three over one log file
//!
//! From the bus's perspective the emitted traffic is indistinguishable
//! from a live vehicle; downstream listeners need not know the frames
//! came from a log.
//!
//! ## Example
//!
//! ```rust,ignore
//! use canreplay_core::replay::{CancelToken, ReplayDriver};
//! use canreplay_core::transport::{SlcanTransport, TransportConfig};
//! use std::fs::File;
//! use std::io::BufReader;
//!
//! let config = TransportConfig {
//!     port_name: "/dev/ttyACM0".into(),
//!     ..Default::default()
//! };
//! let transport = SlcanTransport::new(config);
//! let mut driver = ReplayDriver::new(transport, CancelToken::new());
//!
//! let log = BufReader::new(File::open("capture.csv")?);
//! let summary = driver.run(log)?;
//! println!("sent {} frames", summary.frames_sent);
//! ```

#![warn(missing_docs)]

pub mod log;
pub mod replay;
pub mod transport;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::log::{LogReader, LogRecord, ParseError};
    pub use crate::replay::{
        CancelToken, ReplayDriver, ReplayError, ReplayOutcome, ReplaySummary,
    };
    pub use crate::transport::{FrameSink, SlcanTransport, TransportConfig, TransportError};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
