use crate::error::{Error, ErrorKind};
use castdex_feed::models::{Episode, Podcast};
use exn::ResultExt;

/// Column values for one `podcast` row, in `insert_podcast.sql` order.
pub(crate) struct PodcastRow {
    pub uri: String,
    pub title: Option<String>,
    pub link: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    pub author: Option<String>,
    pub block: bool,
    pub category: Option<String>,
    pub image: Option<String>,
    pub explicit: Option<bool>,
    pub complete: bool,
    pub new_feed_url: Option<String>,
    pub description: Option<String>,
    pub pubdate: Option<i64>,
}
impl From<&Podcast> for PodcastRow {
    fn from(podcast: &Podcast) -> Self {
        Self {
            uri: podcast.uri.clone(),
            title: podcast.title.clone(),
            link: podcast.link.clone(),
            copyright: podcast.copyright.clone(),
            language: podcast.language.clone(),
            author: podcast.author.clone(),
            block: podcast.block,
            category: podcast.category.clone(),
            image: podcast.image.as_ref().map(|image| image.uri.clone()),
            explicit: podcast.explicit,
            complete: podcast.complete,
            new_feed_url: podcast.new_feed_url.clone(),
            description: podcast.description.clone(),
            pubdate: podcast.pubdate.map(|date| date.unix_timestamp()),
        }
    }
}

/// Column values for one `episode` row, in `insert_episode.sql` order.
pub(crate) struct EpisodeRow {
    pub guid: String,
    pub title: Option<String>,
    pub pubdate: Option<i64>,
    pub author: Option<String>,
    pub block: bool,
    pub image: Option<String>,
    pub duration: Option<f64>,
    pub explicit: Option<bool>,
    pub order: Option<i64>,
    pub description: Option<String>,
    pub media_uri: Option<String>,
    pub media_length: Option<i64>,
    pub media_type: Option<String>,
}
impl TryFrom<&Episode> for EpisodeRow {
    type Error = Error;
    fn try_from(episode: &Episode) -> Result<Self, Self::Error> {
        let enclosure = episode.enclosure.as_ref();
        Ok(Self {
            guid: episode.guid.clone(),
            title: episode.title.clone(),
            pubdate: episode.pubdate.map(|date| date.unix_timestamp()),
            author: episode.author.clone(),
            block: episode.block,
            image: episode.image.as_ref().map(|image| image.uri.clone()),
            duration: episode.duration.map(|duration| duration.as_secs_f64()),
            explicit: episode.explicit,
            order: episode.order,
            description: episode.description.clone(),
            media_uri: episode.media_uri().map(str::to_string),
            media_length: enclosure
                .and_then(|e| e.length)
                .map(i64::try_from)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("enclosure length"))?,
            media_type: enclosure.and_then(|e| e.mime_type.clone()),
        })
    }
}
