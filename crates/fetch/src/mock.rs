//! In-memory fetcher for testing.

use crate::error::{ErrorKind, Result};
use crate::{Fetcher, Response};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use time::UtcDateTime;
use tokio::sync::watch;

#[derive(Debug, Clone)]
enum Canned {
    Document { body: Vec<u8>, last_modified: Option<UtcDateTime> },
    Failure(ErrorKind),
}

/// Serves canned documents (or failures) keyed by URI and counts how often
/// each URI was requested. Unknown URIs answer with a 404.
///
/// The gate holds every fetch open until it is released again, which lets
/// tests line up concurrent callers behind a single in-flight fetch:
///
/// ```
/// use castdex_fetch::{Fetcher, MockFetcher};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let fetcher = MockFetcher::default().with_document("http://example.com/rss", "<rss/>");
/// let response = fetcher.fetch("http://example.com/rss", None).await.unwrap();
/// assert_eq!(response.body, b"<rss/>");
/// assert_eq!(fetcher.calls("http://example.com/rss"), 1);
/// # }
/// ```
pub struct MockFetcher {
    documents: Mutex<HashMap<String, Canned>>,
    calls: Mutex<HashMap<String, usize>>,
    gate: watch::Sender<bool>,
}

impl Default for MockFetcher {
    fn default() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            gate: watch::Sender::new(true),
        }
    }
}

impl MockFetcher {
    pub fn with_document(self, uri: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.set_document(uri, body, None);
        self
    }

    /// Replace whatever is served for `uri`.
    pub fn set_document(&self, uri: impl Into<String>, body: impl Into<Vec<u8>>, last_modified: Option<UtcDateTime>) {
        let canned = Canned::Document { body: body.into(), last_modified };
        self.lock_documents().insert(uri.into(), canned);
    }

    /// Make every fetch of `uri` fail with `kind`.
    pub fn set_failure(&self, uri: impl Into<String>, kind: ErrorKind) {
        self.lock_documents().insert(uri.into(), Canned::Failure(kind));
    }

    pub fn remove(&self, uri: &str) {
        self.lock_documents().remove(uri);
    }

    /// Number of fetches started for `uri`, including ones still held at the gate.
    pub fn calls(&self, uri: &str) -> usize {
        self.lock_calls().get(uri).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.lock_calls().values().sum()
    }

    /// Close the gate: fetches started from now on wait for [`release`](Self::release).
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    pub fn release(&self) {
        self.gate.send_replace(true);
    }

    // Test helper, a poisoned lock means another test thread already panicked.
    fn lock_documents(&self) -> std::sync::MutexGuard<'_, HashMap<String, Canned>> {
        self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, HashMap<String, usize>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, uri: &str, timeout: Option<Duration>) -> Result<Response> {
        *self.lock_calls().entry(uri.to_string()).or_default() += 1;

        let mut gate = self.gate.subscribe();
        let opened = async move {
            // The sender lives as long as `self`, so this can't fail.
            let _ = gate.wait_for(|open| *open).await;
        };
        match timeout {
            Some(limit) => {
                if tokio::time::timeout(limit, opened).await.is_err() {
                    exn::bail!(ErrorKind::Timeout(uri.to_string()));
                }
            },
            None => opened.await,
        }

        let canned = self.lock_documents().get(uri).cloned();
        match canned {
            Some(Canned::Document { body, last_modified }) => Ok(Response {
                body,
                last_modified,
                elapsed: Duration::ZERO,
            }),
            Some(Canned::Failure(kind)) => Err(exn::Exn::from(kind)),
            None => Err(exn::Exn::from(ErrorKind::Status(404, uri.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const URI: &str = "http://example.com/feed.xml";

    #[tokio::test]
    async fn test_canned_documents() {
        let fetcher = MockFetcher::default().with_document(URI, "<rss/>");
        assert_eq!(fetcher.fetch(URI, None).await.unwrap().body, b"<rss/>");

        let err = fetcher.fetch("http://example.com/missing", None).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Status(404, "http://example.com/missing".to_string()));

        fetcher.set_failure(URI, ErrorKind::Network(URI.to_string()));
        let err = fetcher.fetch(URI, None).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Network(URI.to_string()));

        assert_eq!(fetcher.calls(URI), 2);
        assert_eq!(fetcher.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_gate() {
        let fetcher = Arc::new(MockFetcher::default().with_document(URI, "<rss/>"));
        fetcher.hold();
        let task = tokio::spawn({
            let fetcher = Arc::clone(&fetcher);
            async move { fetcher.fetch(URI, None).await.map(|r| r.body) }
        });
        tokio::task::yield_now().await;
        assert_eq!(fetcher.calls(URI), 1);
        assert!(!task.is_finished());
        fetcher.release();
        assert_eq!(task.await.unwrap().unwrap(), b"<rss/>");
    }

    #[tokio::test(start_paused = true)]
    async fn test_gate_respects_timeout() {
        let fetcher = MockFetcher::default().with_document(URI, "<rss/>");
        fetcher.hold();
        let err = fetcher.fetch(URI, Some(Duration::from_secs(5))).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Timeout(URI.to_string()));
    }
}
