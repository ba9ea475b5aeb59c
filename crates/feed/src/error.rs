//! Feed Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};

/// A feed parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for feed parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The bytes are not well-formed XML.
    #[display("malformed XML: {_0}")]
    MalformedXml(#[error(not(source))] String),
    /// Well-formed XML, but not the document type that was expected.
    #[display("invalid document: expected {_0}")]
    InvalidDocument(#[error(not(source))] &'static str),
    /// A URI was relative, unparsable, or otherwise unusable as an identity.
    #[display("invalid URI: {_0}")]
    InvalidUri(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // A document is either valid or it isn't; fetching it again is the
        // caller's business, not ours.
        false
    }
}
