//! Capture row parser
//!
//! Decodes one vendor CSV row into a [`LogRecord`].
//!
//! Row layout:
//! `timestamp,channel,id_hex,flags_hex,dlc_hex,d0..d7,counter,abs_time`
//! with unpopulated trailing data fields left empty, not zero-padded.

use std::io::{BufRead, Lines};

use tracing::debug;

use super::{LogRecord, ParseError, HEADER_LINES, MAX_EXTENDED_ID, MAX_FRAME_BYTES};

/// Fields before the data bytes plus the two trailing bookkeeping
/// columns (counter, absolute time).
const FIXED_FIELDS: usize = 7;

/// Largest accepted capture timestamp magnitude, in seconds. Capture
/// clocks count from the start of the log; about 31 years is beyond
/// any real export while keeping every accepted gap representable as a
/// `Duration`.
const MAX_CAPTURE_SECS: f64 = 1e9;

/// Parse one capture row into a [`LogRecord`].
///
/// `line` is the 1-based source line number, used only for error
/// reporting. The payload width is taken from however many data fields
/// are populated; the declared DLC is read and a mismatch is logged but
/// the populated width wins, since vendor exports zero-suppress
/// trailing fields.
pub fn parse_line(line: usize, text: &str) -> Result<LogRecord, ParseError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();
    if fields.len() < FIXED_FIELDS {
        return Err(ParseError::Malformed {
            line,
            field: "row",
            value: text.to_string(),
        });
    }

    let capture_time: f64 = fields[0].parse().map_err(|_| ParseError::Malformed {
        line,
        field: "timestamp",
        value: fields[0].to_string(),
    })?;
    // `f64::from_str` accepts "inf", "nan", and magnitudes far beyond
    // any plausible capture clock; none of those can feed the pacing
    // arithmetic.
    if !capture_time.is_finite() || capture_time.abs() > MAX_CAPTURE_SECS {
        return Err(ParseError::Malformed {
            line,
            field: "timestamp",
            value: fields[0].to_string(),
        });
    }

    let channel = fields[1].to_string();

    let arbitration_id =
        u32::from_str_radix(fields[2], 16).map_err(|_| ParseError::Malformed {
            line,
            field: "arbitration id",
            value: fields[2].to_string(),
        })?;
    if arbitration_id > MAX_EXTENDED_ID {
        return Err(ParseError::Malformed {
            line,
            field: "arbitration id",
            value: fields[2].to_string(),
        });
    }

    let declared_dlc = u8::from_str_radix(fields[4], 16).map_err(|_| ParseError::Malformed {
        line,
        field: "dlc",
        value: fields[4].to_string(),
    })?;

    // Data fields sit between the fixed prefix and the trailing
    // counter/absolute-time columns. FD exports carry more than 8.
    let populated: Vec<&str> = fields[5..fields.len() - 2]
        .iter()
        .copied()
        .filter(|f| !f.is_empty())
        .collect();
    if populated.len() > MAX_FRAME_BYTES {
        return Err(ParseError::Oversized {
            line,
            count: populated.len(),
        });
    }

    let mut data = Vec::with_capacity(populated.len());
    for field in populated {
        let byte = u8::from_str_radix(field, 16).map_err(|_| ParseError::Malformed {
            line,
            field: "data byte",
            value: field.to_string(),
        })?;
        data.push(byte);
    }

    if declared_dlc as usize != data.len() {
        debug!(
            line,
            declared = declared_dlc,
            populated = data.len(),
            "declared DLC disagrees with populated data fields"
        );
    }

    Ok(LogRecord {
        capture_time,
        channel,
        arbitration_id,
        data,
    })
}

/// Streaming reader over a capture log.
///
/// Skips the vendor preamble ([`HEADER_LINES`]) and blank lines, then
/// yields `(line_number, parse result)` for every remaining row. Parse
/// failures are items, not iterator termination: the caller decides
/// whether to skip or abort. A line that fails to read at the I/O level
/// is surfaced the same way so the stream can continue past it.
pub struct LogReader<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> LogReader<R> {
    /// Wrap a buffered reader positioned at the start of the file.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for LogReader<R> {
    type Item = (usize, Result<LogRecord, ParseError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = self.lines.next()?;
            self.line_no += 1;
            if self.line_no <= HEADER_LINES {
                continue;
            }
            match line {
                Ok(text) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    return Some((self.line_no, parse_line(self.line_no, &text)));
                }
                Err(e) => {
                    return Some((
                        self.line_no,
                        Err(ParseError::Malformed {
                            line: self.line_no,
                            field: "line",
                            value: e.to_string(),
                        }),
                    ));
                }
            }
        }
    }
}
