//! Parse errors

use thiserror::Error;

/// Errors produced while parsing one capture log row.
///
/// Both variants are per-record: the replay driver records them and
/// continues with the next line rather than aborting the stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A field failed to decode (non-numeric timestamp, non-hex id or
    /// payload byte, short row).
    #[error("line {line}: malformed {field}: {value:?}")]
    Malformed {
        /// 1-based line number in the source file
        line: usize,
        /// Name of the offending field
        field: &'static str,
        /// Raw text of the offending field
        value: String,
    },

    /// More than 8 populated data fields: a CAN-FD frame, outside the
    /// CAN 2.0 replay target. Never silently truncated.
    #[error("line {line}: {count} data bytes exceed the CAN 2.0 limit of 8")]
    Oversized {
        /// 1-based line number in the source file
        line: usize,
        /// Number of populated data fields found
        count: usize,
    },
}

impl ParseError {
    /// The source line number this error refers to.
    pub fn line(&self) -> usize {
        match self {
            ParseError::Malformed { line, .. } => *line,
            ParseError::Oversized { line, .. } => *line,
        }
    }
}
