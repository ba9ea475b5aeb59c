//! RSS 2.0 feeds, including the iTunes podcast extensions.

use crate::error::{ErrorKind, Result};
use crate::models::{Enclosure, Episode, Image, Podcast};
use ::rss::extension::itunes::{ITunesChannelExtension, ITunesItemExtension};
use ::rss::{Channel, Item};
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;
use time::format_description::well_known::Rfc2822;
use time::{OffsetDateTime, UtcDateTime};

/// `[[hours:]minutes:]seconds`, anything trailing is ignored.
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:(?:(?P<hours>\d+):)?(?P<minutes>\d+):)?(?P<seconds>\d+)").unwrap());

/// Parse an RSS document into a [`Podcast`].
///
/// `uri` is the location the document was fetched from and becomes the
/// podcast's identity. `last_modified` comes from the transport, when known,
/// and takes precedence over episode dates for the podcast's publication date.
/// The encoding named in the XML declaration is honoured.
#[tracing::instrument(skip(data), fields(bytes = data.len()))]
pub fn parse(data: &[u8], uri: &str, last_modified: Option<UtcDateTime>) -> Result<Podcast> {
    let mut podcast = Podcast::new(uri)?;
    let channel = Channel::read_from(data).map_err(|err| {
        let kind = match &err {
            ::rss::Error::InvalidStartTag | ::rss::Error::Eof => ErrorKind::InvalidDocument("RSS feed"),
            other => ErrorKind::MalformedXml(other.to_string()),
        };
        exn::Exn::from(err).raise(kind)
    })?;

    let itunes = channel.itunes_ext();
    podcast.title = text(Some(channel.title()));
    podcast.link = text(Some(channel.link()));
    podcast.copyright = text(channel.copyright());
    podcast.language = text(channel.language());
    podcast.author = text(itunes.and_then(ITunesChannelExtension::author));
    podcast.block = itunes.and_then(ITunesChannelExtension::block).is_some_and(flag);
    podcast.category = text(itunes.and_then(|ext| ext.categories().first()).map(|category| category.text()));
    podcast.image = text(itunes.and_then(ITunesChannelExtension::image))
        .map(Image::new)
        .or_else(|| channel.image().and_then(image));
    podcast.explicit = itunes.and_then(ITunesChannelExtension::explicit).and_then(parse_explicit);
    podcast.complete = itunes.and_then(ITunesChannelExtension::complete).is_some_and(flag);
    podcast.new_feed_url = text(itunes.and_then(ITunesChannelExtension::new_feed_url));
    podcast.description = text(itunes.and_then(ITunesChannelExtension::summary)).or_else(|| text(Some(channel.description())));

    let mut seen = HashSet::new();
    for item in channel.items() {
        let Some(episode) = episode(item) else {
            tracing::warn!(feed = uri, title = item.title(), "skipping episode without GUID or enclosure");
            continue;
        };
        if !seen.insert(episode.guid.clone()) {
            tracing::debug!(feed = uri, guid = %episode.guid, "skipping duplicate episode GUID");
            continue;
        }
        podcast.episodes.push(episode);
    }
    podcast.pubdate = podcast.derive_pubdate(last_modified);
    tracing::debug!(feed = uri, episodes = podcast.episodes.len(), "parsed feed");
    Ok(podcast)
}

fn episode(item: &Item) -> Option<Episode> {
    let itunes = item.itunes_ext();
    let enclosure = item.enclosure().map(enclosure);
    let guid = text(item.guid().map(|guid| guid.value())).or_else(|| enclosure.as_ref().and_then(|e| e.uri.clone()))?;
    Some(Episode {
        guid,
        title: text(item.title()),
        pubdate: item.pub_date().and_then(parse_date),
        author: text(itunes.and_then(ITunesItemExtension::author)),
        block: itunes.and_then(ITunesItemExtension::block).is_some_and(flag),
        image: text(itunes.and_then(ITunesItemExtension::image)).map(Image::new),
        duration: itunes.and_then(ITunesItemExtension::duration).and_then(parse_duration),
        explicit: itunes.and_then(ITunesItemExtension::explicit).and_then(parse_explicit),
        order: itunes.and_then(ITunesItemExtension::order).and_then(|s| s.trim().parse().ok()),
        description: text(itunes.and_then(ITunesItemExtension::summary)).or_else(|| text(item.description())),
        enclosure,
    })
}

/// Trimmed, `None` when empty.
fn text(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("yes")
}

fn image(image: &::rss::Image) -> Option<Image> {
    Some(Image {
        uri: text(Some(image.url()))?,
        width: image.width().and_then(|s| s.trim().parse().ok()),
        height: image.height().and_then(|s| s.trim().parse().ok()),
    })
}

fn enclosure(enclosure: &::rss::Enclosure) -> Enclosure {
    Enclosure {
        uri: text(Some(enclosure.url())),
        length: enclosure.length().trim().parse().ok(),
        mime_type: text(Some(enclosure.mime_type())),
    }
}

pub fn parse_explicit(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "explicit" | "true" => Some(true),
        "clean" | "no" | "false" => Some(false),
        _ => None,
    }
}

pub fn parse_duration(value: &str) -> Option<Duration> {
    let captures = DURATION.captures(value.trim())?;
    let part = |name: &str| -> Option<u64> {
        match captures.name(name) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let seconds = part("hours")?
        .checked_mul(3600)?
        .checked_add(part("minutes")?.checked_mul(60)?)?
        .checked_add(part("seconds")?)?;
    Some(Duration::from_secs(seconds))
}

/// RFC 2822 dates as used by `<pubDate>`. Unparsable dates are treated as unknown.
pub fn parse_date(value: &str) -> Option<UtcDateTime> {
    match OffsetDateTime::parse(value.trim(), &Rfc2822) {
        Ok(date) => Some(UtcDateTime::from(date)),
        Err(err) => {
            tracing::debug!(value, error = %err, "ignoring unparsable date");
            None
        },
    }
}
