//! What the catalog hands out, and how podcasts map onto it.

use super::uri::{album_uri, track_uri};
use castdex_feed::Podcast;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefKind {
    Directory,
    Album,
    Track,
}

/// A named pointer to something browsable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ref {
    #[serde(rename = "type")]
    pub kind: RefKind,
    pub uri: String,
    pub name: Option<String>,
}

impl Ref {
    pub fn album(feed: &str, name: Option<String>) -> Self {
        Self { kind: RefKind::Album, uri: album_uri(feed), name }
    }

    pub fn track(feed: &str, guid: &str, name: Option<String>) -> Self {
        Self { kind: RefKind::Track, uri: track_uri(feed, guid), name }
    }
}

/// A podcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Album {
    pub uri: String,
    pub name: Option<String>,
    pub artists: Vec<String>,
    pub num_tracks: usize,
}

impl From<&Podcast> for Album {
    fn from(podcast: &Podcast) -> Self {
        Self {
            uri: album_uri(&podcast.uri),
            name: podcast.title.clone(),
            artists: podcast.author.iter().cloned().collect(),
            num_tracks: podcast.episodes.len(),
        }
    }
}

/// A playable episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub uri: String,
    pub name: Option<String>,
    pub album: Album,
    pub artists: Vec<String>,
    /// Publication date, `YYYY-MM-DD`.
    pub date: Option<String>,
    /// Milliseconds.
    pub length: Option<u64>,
    pub comment: Option<String>,
    pub genre: Option<String>,
    /// Position of the episode in publication order, starting at 1.
    pub track_no: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Image {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl From<&castdex_feed::models::Image> for Image {
    fn from(image: &castdex_feed::models::Image) -> Self {
        Self { uri: image.uri.clone(), width: image.width, height: image.height }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub albums: Vec<Album>,
    pub tracks: Vec<Track>,
}

/// The playable episodes of a podcast, oldest first unless `reverse`.
///
/// Episodes without a media URI are left out, but still count towards the
/// track numbers of the ones after them.
pub fn tracks(podcast: &Podcast, reverse: bool) -> Vec<Track> {
    let album = Album::from(podcast);
    let mut episodes: Vec<_> = podcast.episodes.iter().collect();
    episodes.sort_by_key(|episode| episode.pubdate);

    let mut tracks: Vec<_> = episodes
        .into_iter()
        .enumerate()
        .filter(|(_, episode)| episode.media_uri().is_some())
        .map(|(index, episode)| Track {
            uri: track_uri(&podcast.uri, &episode.guid),
            name: episode.title.clone(),
            album: album.clone(),
            artists: episode.author.iter().cloned().collect(),
            date: episode.pubdate.map(|pubdate| pubdate.date().to_string()),
            length: episode.duration.and_then(|d| u64::try_from(d.as_millis()).ok()),
            comment: episode.description.clone(),
            genre: podcast.category.clone(),
            track_no: index + 1,
        })
        .collect();
    if reverse {
        tracks.reverse();
    }
    tracks
}

/// Images of a podcast and all of its episodes, keyed by catalog URI.
///
/// Episodes fall back to the podcast's image, listed after their own.
pub fn images(podcast: &Podcast) -> HashMap<String, Vec<Image>> {
    let default: Vec<Image> = podcast.image.iter().map(Image::from).collect();
    let mut result = HashMap::with_capacity(podcast.episodes.len() + 1);
    for episode in &podcast.episodes {
        let images = episode.image.iter().map(Image::from).chain(default.iter().cloned()).collect();
        result.insert(track_uri(&podcast.uri, &episode.guid), images);
    }
    result.insert(album_uri(&podcast.uri), default);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use castdex_feed::Episode;
    use castdex_feed::models::{Enclosure, Image as FeedImage};
    use std::time::Duration;
    use time::macros::datetime;

    fn episode(guid: &str, day: Option<u8>, media: bool) -> Episode {
        let mut episode = Episode::new(guid);
        episode.title = Some(format!("Episode {guid}"));
        episode.pubdate = day.map(|day| datetime!(2024-01-01 12:00).as_utc() + time::Duration::days(i64::from(day) - 1));
        if media {
            episode.enclosure = Some(Enclosure {
                uri: Some(format!("http://example.com/{guid}.mp3")),
                ..Enclosure::default()
            });
        }
        episode
    }

    fn podcast() -> Podcast {
        let mut podcast = Podcast::new("http://example.com/feed.xml").unwrap();
        podcast.title = Some("Example".to_string());
        podcast.author = Some("Jane Doe".to_string());
        podcast.category = Some("Technology".to_string());
        podcast.image = Some(FeedImage::new("http://example.com/cover.png"));
        let mut second = episode("b", Some(2), true);
        second.duration = Some(Duration::from_secs(90));
        second.image = Some(FeedImage::new("http://example.com/b.png"));
        podcast.episodes = vec![second, episode("c", Some(3), false), episode("a", Some(1), true), episode("d", Some(4), true)];
        podcast
    }

    #[test]
    fn test_tracks_ascending() {
        let tracks = tracks(&podcast(), false);
        let summary: Vec<_> = tracks.iter().map(|t| (t.uri.as_str(), t.track_no)).collect();
        assert_eq!(
            summary,
            vec![
                ("podcast+http://example.com/feed.xml#a", 1),
                ("podcast+http://example.com/feed.xml#b", 2),
                ("podcast+http://example.com/feed.xml#d", 4),
            ]
        );
        let second = &tracks[1];
        assert_eq!(second.length, Some(90_000));
        assert_eq!(second.date.as_deref(), Some("2024-01-02"));
        assert_eq!(second.genre.as_deref(), Some("Technology"));
        assert_eq!(second.album.artists, vec!["Jane Doe"]);
        assert_eq!(second.album.num_tracks, 4);
    }

    #[test]
    fn test_tracks_descending() {
        let numbers: Vec<_> = tracks(&podcast(), true).iter().map(|t| t.track_no).collect();
        assert_eq!(numbers, vec![4, 2, 1]);
    }

    #[test]
    fn test_images() {
        let images = images(&podcast());
        let uris = |key: &str| -> Vec<String> { images[key].iter().map(|i| i.uri.clone()).collect() };
        assert_eq!(uris("podcast+http://example.com/feed.xml"), vec!["http://example.com/cover.png"]);
        assert_eq!(
            uris("podcast+http://example.com/feed.xml#b"),
            vec!["http://example.com/b.png", "http://example.com/cover.png"]
        );
        assert_eq!(uris("podcast+http://example.com/feed.xml#a"), vec!["http://example.com/cover.png"]);
    }

    #[test]
    fn test_refs() {
        let track = Ref::track("http://example.com/feed.xml", "a b", None);
        assert_eq!(track.uri, "podcast+http://example.com/feed.xml#a%20b");
        assert_eq!(serde_json::to_value(&track).unwrap()["type"], "track");
    }
}
