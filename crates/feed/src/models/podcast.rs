use super::{Episode, Image};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use time::UtcDateTime;
use url::Url;

/// A podcast and all of its episodes, as described by one feed.
///
/// Podcasts are values: a refresh replaces the whole thing rather than
/// patching individual fields or episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podcast {
    /// The feed URL. Absolute, never carries a fragment.
    pub uri: String,
    pub title: Option<String>,
    /// Website corresponding to the podcast.
    pub link: Option<String>,
    pub copyright: Option<String>,
    /// ISO two-letter language code.
    pub language: Option<String>,
    pub author: Option<String>,
    pub block: bool,
    /// The main category.
    pub category: Option<String>,
    pub image: Option<Image>,
    pub explicit: Option<bool>,
    /// The podcast will never publish another episode.
    pub complete: bool,
    /// Announced new location of the feed.
    pub new_feed_url: Option<String>,
    pub description: Option<String>,
    /// See [`Podcast::derive_pubdate`].
    pub pubdate: Option<UtcDateTime>,
    pub episodes: Vec<Episode>,
}
impl Podcast {
    /// Create an empty podcast for the given feed URI.
    ///
    /// The URI must be absolute; a fragment, if any, is dropped.
    pub fn new(uri: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            uri: validate_uri(uri)?,
            title: None,
            link: None,
            copyright: None,
            language: None,
            author: None,
            block: false,
            category: None,
            image: None,
            explicit: None,
            complete: false,
            new_feed_url: None,
            description: None,
            pubdate: None,
            episodes: Vec::new(),
        })
    }

    /// The publication timestamp of the podcast: the transport's last-modified
    /// time if known, else the most recent episode publication time.
    pub fn derive_pubdate(&self, last_modified: Option<UtcDateTime>) -> Option<UtcDateTime> {
        last_modified.or_else(|| self.episodes.iter().filter_map(|e| e.pubdate).max())
    }

    pub fn episode(&self, guid: impl AsRef<str>) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.guid == guid.as_ref())
    }
}

/// Validates that `uri` is absolute and strips any fragment.
///
/// The string itself is otherwise kept as-is (not normalized) because it's the
/// identity used to compare stored feeds with configured ones.
pub fn validate_uri(uri: impl AsRef<str>) -> Result<String> {
    let uri = uri.as_ref().trim();
    let stripped = uri.split_once('#').map_or(uri, |(head, _)| head);
    Url::parse(stripped).or_raise(|| ErrorKind::InvalidUri(uri.to_string()))?;
    Ok(stripped.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use time::macros::datetime;

    #[rstest]
    #[case("http://example.com/feed.xml", "http://example.com/feed.xml")]
    #[case("https://example.com/feed.xml#latest", "https://example.com/feed.xml")]
    #[case("  https://example.com/rss?a=1&b=2 ", "https://example.com/rss?a=1&b=2")]
    fn test_validate_uri(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate_uri(input).unwrap(), expected);
    }

    #[rstest]
    #[case("feed.xml")]
    #[case("/var/feeds/feed.xml")]
    #[case("")]
    fn test_validate_uri_rejects_relative(#[case] input: &str) {
        let err = validate_uri(input).unwrap_err();
        assert!(matches!(*err, ErrorKind::InvalidUri(_)));
    }

    #[test]
    fn test_pubdate_prefers_last_modified() {
        let mut podcast = Podcast::new("http://example.com/rss").unwrap();
        let mut episode = Episode::new("1");
        episode.pubdate = Some(datetime!(2024-01-01 10:00).as_utc());
        podcast.episodes.push(episode);
        let modified = datetime!(2024-02-01 00:00).as_utc();
        assert_eq!(podcast.derive_pubdate(Some(modified)), Some(modified));
    }

    #[test]
    fn test_pubdate_falls_back_to_latest_episode() {
        let mut podcast = Podcast::new("http://example.com/rss").unwrap();
        for (guid, date) in [("1", datetime!(2024-01-01 10:00).as_utc()), ("2", datetime!(2024-03-01 10:00).as_utc())] {
            let mut episode = Episode::new(guid);
            episode.pubdate = Some(date);
            podcast.episodes.push(episode);
        }
        podcast.episodes.push(Episode::new("undated"));
        assert_eq!(podcast.derive_pubdate(None), Some(datetime!(2024-03-01 10:00).as_utc()));
        assert_eq!(Podcast::new("http://example.com/empty").unwrap().derive_pubdate(None), None);
    }
}
