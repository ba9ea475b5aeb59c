use super::{Enclosure, Image};
use std::time::Duration;
use time::UtcDateTime;

/// A single podcast episode.
///
/// The GUID is case-sensitive and unique within the parent podcast. Feeds
/// that don't declare one get the enclosure URI instead (see
/// [`rss::parse`](crate::rss::parse)), so a parsed episode never has an
/// empty GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Episode {
    pub guid: String,
    pub title: Option<String>,
    pub pubdate: Option<UtcDateTime>,
    pub author: Option<String>,
    /// Prevent the episode from appearing in directories.
    pub block: bool,
    pub image: Option<Image>,
    pub duration: Option<Duration>,
    /// `None` when the feed doesn't say (or says something unrecognizable).
    pub explicit: Option<bool>,
    /// Manual override of the default (publication date) ordering.
    pub order: Option<i64>,
    pub description: Option<String>,
    pub enclosure: Option<Enclosure>,
}
impl Episode {
    pub fn new(guid: impl Into<String>) -> Self {
        Self { guid: guid.into(), ..Default::default() }
    }

    /// Location of the episode's media object, if it has one.
    pub fn media_uri(&self) -> Option<&str> {
        self.enclosure.as_ref().and_then(|e| e.uri.as_deref())
    }
}
