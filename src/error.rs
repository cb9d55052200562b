//! Error types
//!
//! A single crate-level [`Error`] with one sub-enum per concern. Most failures
//! in the relay are absorbed where they happen (dropped records, skipped
//! recipients); these types cover the ones that end a connection task or
//! fail server startup.

use std::fmt;
use std::io;

/// Crate result alias
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug)]
pub enum Error {
    /// Socket bind, accept, read or write failure
    Io(io::Error),
    /// Line framing failure on a connection
    Frame(FrameError),
    /// Event record could not be parsed
    Parse(ParseError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Frame(e) => write!(f, "Framing error: {}", e),
            Error::Parse(e) => write!(f, "Parse error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Frame(e) => Some(e),
            Error::Parse(e) => Some(e),
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Error::Frame(e)
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

/// Errors raised while splitting a byte stream into lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// A line grew past the configured limit without a terminator
    LineTooLong { limit: usize },
    /// A subscriber sent a blank identity line
    EmptyIdentity,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::LineTooLong { limit } => {
                write!(f, "Line exceeds {} bytes without terminator", limit)
            }
            FrameError::EmptyIdentity => write!(f, "Subscriber sent an empty identity"),
        }
    }
}

impl std::error::Error for FrameError {}

/// Errors raised while parsing an event record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The leading field is not a positive integer
    InvalidSequence(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InvalidSequence(field) => {
                write!(f, "Invalid sequence field: {:?}", field)
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed");
        let err: Error = io_err.into();

        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }

    #[test]
    fn test_frame_error_display() {
        let err: Error = FrameError::LineTooLong { limit: 16 }.into();
        assert_eq!(
            err.to_string(),
            "Framing error: Line exceeds 16 bytes without terminator"
        );
    }

    #[test]
    fn test_parse_error_source() {
        use std::error::Error as _;

        let err: Error = ParseError::InvalidSequence("abc".into()).into();
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "Parse error: Invalid sequence field: \"abc\"");
    }
}
