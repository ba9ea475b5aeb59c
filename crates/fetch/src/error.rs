//! Fetch Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A transport error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Not something that can be fetched.
    #[display("invalid URI: {_0}")]
    InvalidUri(#[error(not(source))] String),
    /// No complete response within the allotted time.
    #[display("timed out fetching {_0}")]
    Timeout(#[error(not(source))] String),
    /// Connection, TLS or protocol failure.
    #[display("network error fetching {_0}")]
    Network(#[error(not(source))] String),
    /// The server answered, but not with a success status.
    #[display("HTTP status {_0} fetching {_1}")]
    Status(#[error(not(source))] u16, #[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::InvalidUri(_) => false,
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Status(code, _) => *code == 429 || *code >= 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        let uri = || "http://example.com/feed.xml".to_string();
        assert!(ErrorKind::Timeout(uri()).is_retryable());
        assert!(ErrorKind::Network(uri()).is_retryable());
        assert!(ErrorKind::Status(503, uri()).is_retryable());
        assert!(ErrorKind::Status(429, uri()).is_retryable());
        assert!(!ErrorKind::Status(404, uri()).is_retryable());
        assert!(!ErrorKind::InvalidUri("feed.xml".to_string()).is_retryable());
    }

    #[test]
    fn test_display() {
        let kind = ErrorKind::Status(404, "http://example.com/feed.xml".to_string());
        assert_eq!(kind.to_string(), "HTTP status 404 fetching http://example.com/feed.xml");
    }
}
