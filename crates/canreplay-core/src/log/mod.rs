//! Capture Log Handling
//!
//! Parses vendor CSV capture logs into CAN 2.0 frame records.

mod error;
mod parser;

pub use error::ParseError;
pub use parser::{parse_line, LogReader};

/// Number of preamble lines at the top of a vendor export.
///
/// These hold tool metadata, not frames, and are skipped regardless of
/// content.
pub const HEADER_LINES: usize = 8;

/// Maximum payload width of a CAN 2.0 frame.
pub const MAX_FRAME_BYTES: usize = 8;

/// Highest valid 29-bit (extended) arbitration identifier.
pub const MAX_EXTENDED_ID: u32 = 0x1FFF_FFFF;

/// Highest valid 11-bit (standard) arbitration identifier.
pub const MAX_STANDARD_ID: u32 = 0x7FF;

/// One frame from the capture log, with its original timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Capture timestamp in seconds from the start of the log
    pub capture_time: f64,
    /// Capture channel identifier (informational only)
    pub channel: String,
    /// 11- or 29-bit CAN arbitration identifier
    pub arbitration_id: u32,
    /// Payload bytes (0–8, CAN 2.0)
    pub data: Vec<u8>,
}

impl LogRecord {
    /// Data length code: the payload byte count.
    pub fn dlc(&self) -> u8 {
        self.data.len() as u8
    }

    /// Whether the identifier needs the 29-bit (extended) format.
    pub fn is_extended(&self) -> bool {
        self.arbitration_id > MAX_STANDARD_ID
    }
}
