//! In-memory cache of parsed feeds.
//!
//! Sits between the catalog (and the refresh scheduler) and the network: a
//! feed is fetched and parsed at most once per TTL, and concurrent requests
//! for a feed that is already being loaded share the one load instead of
//! starting their own.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use castdex_feed::Podcast;
use castdex_fetch::FetcherHandle;
use castdex_fetch::error::ErrorKind as FetchErrorKind;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::instrument;

/// Produces a parsed podcast for a feed URI.
#[async_trait]
pub trait FeedLoader: Send + Sync {
    async fn load(&self, uri: &str, timeout: Option<Duration>) -> Result<Podcast>;
}

/// Fetches a feed and parses it as RSS.
pub struct RssLoader {
    fetcher: FetcherHandle,
}

impl RssLoader {
    pub fn new(fetcher: FetcherHandle) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl FeedLoader for RssLoader {
    async fn load(&self, uri: &str, timeout: Option<Duration>) -> Result<Podcast> {
        let response = self.fetcher.fetch(uri, timeout).await.map_err(ErrorKind::fetch)?;
        let podcast =
            castdex_feed::rss::parse(&response.body, uri, response.last_modified).map_err(ErrorKind::feed)?;
        tracing::debug!(uri, elapsed = ?response.elapsed, episodes = podcast.episodes.len(), "loaded feed");
        Ok(podcast)
    }
}

// Waiters only get the kind; the full error tree is logged once by the load.
type Outcome = std::result::Result<Arc<Podcast>, ErrorKind>;
type Load = Shared<BoxFuture<'static, Outcome>>;

struct Cached {
    podcast: Arc<Podcast>,
    expires: Instant,
}

struct Pending {
    id: u64,
    load: Load,
}

struct State {
    entries: LruCache<String, Cached>,
    loading: HashMap<String, Pending>,
    next_id: u64,
}

impl State {
    fn fresh(&mut self, uri: &str) -> Option<Arc<Podcast>> {
        let expires = self.entries.get(uri)?.expires;
        if expires > Instant::now() {
            self.entries.get(uri).map(|cached| Arc::clone(&cached.podcast))
        } else {
            self.entries.pop(uri);
            None
        }
    }

    /// Record the outcome of load `id`. A load that was invalidated (or
    /// replaced) in the meantime leaves no trace.
    fn settle(&mut self, uri: &str, id: u64, outcome: &Outcome, ttl: Duration) {
        if self.loading.get(uri).is_none_or(|pending| pending.id != id) {
            return;
        }
        self.loading.remove(uri);
        if let Ok(podcast) = outcome {
            let expires = Instant::now() + ttl;
            self.entries.put(uri.to_string(), Cached { podcast: Arc::clone(podcast), expires });
        }
    }
}

pub struct FeedCache {
    loader: Arc<dyn FeedLoader>,
    ttl: Duration,
    state: Arc<Mutex<State>>,
}

impl FeedCache {
    pub fn new(loader: Arc<dyn FeedLoader>, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            loader,
            ttl,
            state: Arc::new(Mutex::new(State {
                entries: LruCache::new(capacity),
                loading: HashMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Return the cached podcast for `uri`, loading it if it's missing or
    /// expired.
    ///
    /// Only the first caller for an uncached feed starts a load (with its
    /// `timeout`); everyone else arriving before it finishes joins that same
    /// load and sees the same outcome. Each caller waits at most its own
    /// `timeout`, after which it gets [`FetchErrorKind::Timeout`] while the
    /// load carries on for the others. Failures are not cached.
    #[instrument(skip(self))]
    pub async fn get_or_compute(&self, uri: &str, timeout: Option<Duration>) -> Result<Arc<Podcast>> {
        let load = {
            let mut state = self.state();
            if let Some(podcast) = state.fresh(uri) {
                tracing::debug!("cache hit");
                return Ok(podcast);
            }
            match state.loading.get(uri) {
                Some(pending) => pending.load.clone(),
                None => self.start(&mut state, uri, timeout),
            }
        };

        let outcome = match timeout {
            Some(limit) => tokio::time::timeout(limit, load).await.unwrap_or_else(|_| {
                tracing::debug!(?limit, "gave up waiting for feed");
                Err(ErrorKind::Fetch(FetchErrorKind::Timeout(uri.to_string())))
            }),
            None => load.await,
        };
        outcome.map_err(exn::Exn::from)
    }

    /// Peek at the cached podcast for `uri` without loading anything.
    pub fn get(&self, uri: &str) -> Option<Arc<Podcast>> {
        self.state().fresh(uri)
    }

    /// Drop every cached podcast. Loads currently in flight still complete
    /// for their waiters, but their results aren't kept.
    pub fn invalidate_all(&self) {
        let mut state = self.state();
        state.entries.clear();
        state.loading.clear();
        tracing::debug!("cache invalidated");
    }

    /// Number of cached podcasts, expired ones included until they're next
    /// looked at or evicted.
    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the load for `uri` and register it as pending.
    ///
    /// The load runs as its own task and settles the cache when it finishes,
    /// whether or not anyone is still waiting for it.
    fn start(&self, state: &mut State, uri: &str, timeout: Option<Duration>) -> Load {
        state.next_id += 1;
        let id = state.next_id;
        let loader = Arc::clone(&self.loader);
        let shared: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        let ttl = self.ttl;
        let key = uri.to_string();
        let task = tokio::spawn(async move {
            let outcome = match loader.load(&key, timeout).await {
                Ok(podcast) => Ok(Arc::new(podcast)),
                Err(err) => {
                    tracing::debug!(uri = key.as_str(), error = ?err, "loading feed failed");
                    Err((*err).clone())
                },
            };
            if let Some(state) = shared.upgrade() {
                lock(&state).settle(&key, id, &outcome, ttl);
            }
            outcome
        });
        let load = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => Err(ErrorKind::Stopped),
            }
        }
        .boxed()
        .shared();
        state.loading.insert(uri.to_string(), Pending { id, load: load.clone() });
        load
    }

    fn state(&self) -> MutexGuard<'_, State> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    // Nothing panics while holding the lock, and the state stays consistent
    // between statements regardless.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
