//! Parse failure reporting.

use thiserror::Error;

/// Error produced when source text cannot be tokenized or parsed.
///
/// Positions are 1-based, matching the way Python tracebacks report
/// locations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    /// Human-readable description of what went wrong.
    pub message: String,
    /// 1-based line of the offending character.
    pub line: usize,
    /// 1-based column of the offending character.
    pub column: usize,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        ParseError {
            message: message.into(),
            line,
            column,
        }
    }

    /// Build an error from a byte offset into `source`.
    pub(crate) fn at_offset(message: impl Into<String>, source: &str, offset: usize) -> Self {
        let (line, column) = position_of(source, offset);
        ParseError::new(message, line, column)
    }
}

/// Convert a byte offset to a (line, column) pair, both 1-based.
fn position_of(source: &str, offset: usize) -> (usize, usize) {
    let clamped = offset.min(source.len());
    let mut line = 1;
    let mut column = 1;
    for ch in source[..clamped].chars() {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
