//! The catalog: podcasts as albums, episodes as tracks.
//!
//! Listing and searching go to the store, which is kept up to date by the
//! refresh scheduler. Anything needing a podcast's full contents (its tracks,
//! images and media URIs) goes through the feed cache instead, using the
//! configured timeout, so a caller never waits on the scheduler.

mod models;
mod uri;

pub use self::models::{Album, Image, Ref, RefKind, SearchResult, Track, images, tracks};
pub use self::uri::{CatalogUri, ROOT_URI, album_uri, track_uri};
use crate::cache::FeedCache;
use crate::error::{ErrorKind, Result};
use crate::refresh::RefreshHandle;
use crate::translate::{Query, translate, translate_projection};
use castdex_config::{Config, Order};
use castdex_feed::Podcast;
use castdex_store::Repository;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub struct Catalog {
    cache: Arc<FeedCache>,
    repository: Repository,
    scheduler: Option<RefreshHandle>,
    browse_order: Order,
    lookup_order: Order,
    search_limit: Option<u64>,
    timeout: Option<Duration>,
}

impl Catalog {
    pub fn new(cache: Arc<FeedCache>, repository: Repository, config: &Config) -> Self {
        Self {
            cache,
            repository,
            scheduler: None,
            browse_order: config.browse_order,
            lookup_order: config.lookup_order,
            search_limit: config.search_limit,
            timeout: config.fetch_timeout(),
        }
    }

    pub fn with_scheduler(mut self, scheduler: RefreshHandle) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn root() -> Ref {
        Ref { kind: RefKind::Directory, uri: ROOT_URI.to_string(), name: Some("Podcasts".to_string()) }
    }

    async fn podcast(&self, feed: &str) -> Result<Arc<Podcast>> {
        self.cache.get_or_compute(feed, self.timeout).await
    }

    /// List the podcasts (for the root) or the episodes of a podcast.
    #[instrument(skip(self))]
    pub async fn browse(&self, uri: &str) -> Result<Vec<Ref>> {
        match CatalogUri::parse(uri)? {
            CatalogUri::Root => {
                let entries = self.repository.list(0, None).await.map_err(ErrorKind::store)?;
                Ok(entries.into_iter().map(|entry| Ref::album(&entry.uri, entry.title)).collect())
            },
            CatalogUri::Album { feed } => {
                let podcast = self.podcast(feed).await?;
                let tracks = tracks(&podcast, self.browse_order == Order::Desc);
                Ok(tracks.into_iter().map(|t| Ref { kind: RefKind::Track, uri: t.uri, name: t.name }).collect())
            },
            CatalogUri::Track { .. } => exn::bail!(ErrorKind::InvalidUri(uri.to_string())),
        }
    }

    /// All tracks of an album, or the single track a track URI points at.
    #[instrument(skip(self))]
    pub async fn lookup(&self, uri: &str) -> Result<Vec<Track>> {
        let parsed = CatalogUri::parse(uri)?;
        let Some(feed) = parsed.feed() else {
            exn::bail!(ErrorKind::InvalidUri(uri.to_string()));
        };
        let podcast = self.podcast(feed).await?;
        let mut tracks = tracks(&podcast, self.lookup_order == Order::Desc);
        if let CatalogUri::Track { .. } = parsed {
            tracks.retain(|track| track.uri == uri);
            if tracks.is_empty() {
                tracing::debug!("no such track");
            }
        }
        Ok(tracks)
    }

    /// Search the index. Fields outside the searchable vocabulary make the
    /// whole search come back empty; results that can't be resolved to a
    /// podcast are left out.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &Query) -> Result<SearchResult> {
        let params = match translate(query) {
            Ok(params) => params,
            Err(err) if matches!(*err, ErrorKind::UnsupportedField(_)) => {
                tracing::info!(error = %*err, "not searching podcasts");
                return Ok(SearchResult::default());
            },
            Err(err) => return Err(err),
        };
        let entries = self.repository.search(&params, 0, self.search_limit).await.map_err(ErrorKind::store)?;

        let mut result = SearchResult::default();
        for entry in entries {
            let resolved = match &entry.guid {
                Some(guid) => self.lookup(&track_uri(&entry.uri, guid)).await.map(|tracks| result.tracks.extend(tracks)),
                None => self.podcast(&entry.uri).await.map(|podcast| result.albums.push(Album::from(&*podcast))),
            };
            if let Err(err) = resolved {
                tracing::error!(uri = %entry.uri, guid = ?entry.guid, error = ?err, "cannot resolve search result");
            }
        }
        Ok(result)
    }

    /// Distinct values of a catalog field among the entries matching `query`.
    #[instrument(skip(self))]
    pub async fn distinct(&self, field: &str, query: &Query) -> Result<Vec<String>> {
        let projection = translate_projection(field)?;
        let params = translate(query)?;
        self.repository.distinct(projection, &params).await.map_err(ErrorKind::store)
    }

    /// Images for each of the given album or track URIs. URIs whose podcast
    /// can't be loaded are left out.
    #[instrument(skip_all, fields(uris = uris.len()))]
    pub async fn images<S: AsRef<str>>(&self, uris: &[S]) -> HashMap<String, Vec<Image>> {
        let mut feeds: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for uri in uris.iter().map(AsRef::as_ref) {
            match CatalogUri::parse(uri).map(|parsed| parsed.feed()) {
                Ok(Some(feed)) => feeds.entry(feed).or_default().push(uri),
                Ok(None) => {},
                Err(err) => tracing::warn!(uri, error = %*err, "no images for URI"),
            }
        }

        let mut result = HashMap::new();
        for (feed, wanted) in feeds {
            let podcast = match self.podcast(feed).await {
                Ok(podcast) => podcast,
                Err(err) => {
                    tracing::error!(feed, error = ?err, "cannot retrieve images");
                    continue;
                },
            };
            let mut available = images(&podcast);
            for uri in wanted {
                if let Some(images) = available.remove(uri) {
                    result.insert(uri.to_string(), images);
                }
            }
        }
        result
    }

    /// The media URI to play for a track.
    #[instrument(skip(self))]
    pub async fn translate_uri(&self, uri: &str) -> Result<Option<String>> {
        let CatalogUri::Track { feed, guid } = CatalogUri::parse(uri)? else {
            exn::bail!(ErrorKind::InvalidUri(uri.to_string()));
        };
        let podcast = self.podcast(feed).await?;
        let media = podcast.episode(&guid).and_then(|episode| episode.media_uri()).map(str::to_string);
        if media.is_none() {
            tracing::warn!(feed, guid = %guid, "no media for episode");
        }
        Ok(media)
    }

    /// Forget cached feeds and ask the scheduler for a refresh cycle.
    pub fn refresh(&self) -> Result<()> {
        self.cache.invalidate_all();
        match &self.scheduler {
            Some(scheduler) => scheduler.refresh(),
            None => Ok(()),
        }
    }
}
