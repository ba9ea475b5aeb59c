//! Retrieval of feed documents.
//!
//! Everything that talks to the network goes through the [`Fetcher`] trait so
//! the rest of the workspace can be tested against [`MockFetcher`] (behind the
//! `mock` feature) instead of real servers.

pub mod error;
mod http;
#[cfg(feature = "mock")]
mod mock;

pub use self::http::{HttpFetcher, USER_AGENT, parse_http_date};
#[cfg(feature = "mock")]
pub use self::mock::MockFetcher;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use time::UtcDateTime;

pub type FetcherHandle = Arc<dyn Fetcher + Send + Sync>;

/// A fetched document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: Vec<u8>,
    /// From the transport (`Last-Modified`), when the server provided one.
    pub last_modified: Option<UtcDateTime>,
    /// Wall-clock time spent fetching.
    pub elapsed: Duration,
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Retrieve the document at `uri`.
    ///
    /// With a `timeout`, the whole exchange (connecting, headers and body)
    /// must complete in time or the fetch fails with
    /// [`ErrorKind::Timeout`](error::ErrorKind::Timeout). Without one, the
    /// fetch waits as long as it takes.
    async fn fetch(&self, uri: &str, timeout: Option<Duration>) -> Result<Response>;
}
