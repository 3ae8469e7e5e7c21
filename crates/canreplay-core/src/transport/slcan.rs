//! SLCAN wire protocol
//!
//! ASCII protocol spoken by CAN232/CANable-style serial adapters.
//!
//! Frame formats:
//!   Standard: t<ID:3hex><DLC:1hex><DATA:2hex*DLC>\r
//!   Extended: T<ID:8hex><DLC:1hex><DATA:2hex*DLC>\r

use std::fmt::Write;

use crate::log::LogRecord;

/// Open the CAN channel
pub const CMD_OPEN: &[u8] = b"O\r";

/// Close the CAN channel
pub const CMD_CLOSE: &[u8] = b"C\r";

/// CAN232 `Sn` bitrate code for a bus bitrate, if the adapter table
/// defines one.
pub fn bitrate_code(bitrate: u32) -> Option<char> {
    match bitrate {
        10_000 => Some('0'),
        20_000 => Some('1'),
        50_000 => Some('2'),
        100_000 => Some('3'),
        125_000 => Some('4'),
        250_000 => Some('5'),
        500_000 => Some('6'),
        800_000 => Some('7'),
        1_000_000 => Some('8'),
        _ => None,
    }
}

/// Build the `Sn\r` bitrate setup command.
pub fn bitrate_command(code: char) -> Vec<u8> {
    format!("S{}\r", code).into_bytes()
}

/// Encode one record as an SLCAN data frame, trailing `\r` included.
///
/// Infallible: the parser guarantees the payload is at most 8 bytes and
/// the identifier fits 29 bits.
pub fn encode_frame(record: &LogRecord) -> Vec<u8> {
    let mut cmd = String::with_capacity(32);
    if record.is_extended() {
        let _ = write!(cmd, "T{:08X}", record.arbitration_id);
    } else {
        let _ = write!(cmd, "t{:03X}", record.arbitration_id);
    }
    let _ = write!(cmd, "{:X}", record.dlc());
    for byte in &record.data {
        let _ = write!(cmd, "{:02X}", byte);
    }
    cmd.push('\r');
    cmd.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(id: u32, data: Vec<u8>) -> LogRecord {
        LogRecord {
            capture_time: 0.0,
            channel: "0".into(),
            arbitration_id: id,
            data,
        }
    }

    #[test]
    fn test_encode_standard_frame() {
        let encoded = encode_frame(&record(0x123, vec![0x01, 0x02, 0x03]));
        assert_eq!(encoded, b"t1233010203\r");
    }

    #[test]
    fn test_encode_extended_frame() {
        let encoded = encode_frame(&record(0x1234_5678, vec![0xAA, 0xBB]));
        assert_eq!(encoded, b"T123456782AABB\r");
    }

    #[test]
    fn test_encode_empty_payload() {
        let encoded = encode_frame(&record(0x7FF, vec![]));
        assert_eq!(encoded, b"t7FF0\r");
    }

    #[test]
    fn test_bitrate_codes() {
        assert_eq!(bitrate_code(500_000), Some('6'));
        assert_eq!(bitrate_code(1_000_000), Some('8'));
        assert_eq!(bitrate_code(300_000), None);
        assert_eq!(bitrate_command('6'), b"S6\r");
    }
}
