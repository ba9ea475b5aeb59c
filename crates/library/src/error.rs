//! Library Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction. Errors from the feed, fetch and store
//! crates are wrapped with their kind preserved, so callers can still tell a
//! timeout from a malformed feed.

use castdex_feed::error::{Error as FeedError, ErrorKind as FeedErrorKind};
use castdex_fetch::error::{Error as FetchError, ErrorKind as FetchErrorKind};
use castdex_store::error::{Error as StoreError, ErrorKind as StoreErrorKind};
use derive_more::{Display, Error};

/// A library error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// ### Dependency Errors
/// - [`ErrorKind::Fetch`]
/// - [`ErrorKind::Feed`]
/// - [`ErrorKind::Store`]
///
/// ### Operational Errors
/// - [`ErrorKind::UnsupportedField`]
/// - [`ErrorKind::InvalidUri`]
/// - [`ErrorKind::NotFound`]
/// - [`ErrorKind::Stopped`]
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The feed couldn't be retrieved.
    #[display("fetch error: {_0}")]
    Fetch(FetchErrorKind),
    /// The feed (or subscription list) was retrieved but couldn't be parsed.
    #[display("feed error: {_0}")]
    Feed(FeedErrorKind),
    #[display("store error: {_0}")]
    Store(StoreErrorKind),
    /// A query named a field outside the searchable vocabulary.
    #[display("unsupported field: {_0}")]
    UnsupportedField(#[error(not(source))] String),
    /// Not a catalog URI this library understands.
    #[display("invalid catalog URI: {_0}")]
    InvalidUri(#[error(not(source))] String),
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// The refresh scheduler, or the runtime a feed load was running on, has
    /// already shut down.
    #[display("stopped")]
    Stopped,
}

impl ErrorKind {
    /// Convert a fetch error, keeping its `Exn` frame as a child in the error
    /// tree.
    #[track_caller]
    pub fn fetch(err: FetchError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Fetch(inner))
    }

    #[track_caller]
    pub fn feed(err: FeedError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Feed(inner))
    }

    #[track_caller]
    pub fn store(err: StoreError) -> Error {
        let inner = (*err).clone();
        err.raise(ErrorKind::Store(inner))
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Fetch(kind) => kind.is_retryable(),
            Self::Feed(kind) => kind.is_retryable(),
            Self::Store(kind) => kind.is_retryable(),
            Self::UnsupportedField(_) | Self::InvalidUri(_) | Self::NotFound(_) | Self::Stopped => false,
        }
    }
}
