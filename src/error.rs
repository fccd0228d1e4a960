//! Error taxonomy shared by index building, line access and search.

use std::fmt;
use std::io;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while indexing, reading or searching a file
#[derive(Debug)]
pub enum Error {
    /// The operation was aborted through its abort flag
    Cancelled,
    /// The backing file could not be read
    Io(io::Error),
    /// A requested line range lies outside the file
    InvalidRange { start: usize, end: usize, total: usize },
    /// The search worker could not be started
    WorkerUnavailable(String),
    /// The search input cannot form a predicate
    InvalidQuery(String),
}

impl Error {
    /// Cancellation is intentional and never reported to the user
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::InvalidRange { start, end, total } => write!(
                f,
                "Invalid line range {}-{} (file has {} lines)",
                start, end, total
            ),
            Error::WorkerUnavailable(msg) => write!(f, "Search worker unavailable: {}", msg),
            Error::InvalidQuery(msg) => write!(f, "Invalid query: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancelled_is_distinguishable() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::InvalidQuery("x".into()).is_cancelled());
    }

    #[test]
    fn test_io_conversion_keeps_source() {
        let err: Error = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "I/O error: gone");
    }
}
