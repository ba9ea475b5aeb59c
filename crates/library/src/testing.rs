//! Feeds shared by the tests in this crate.

use castdex_fetch::MockFetcher;

pub(crate) const FEED_A: &str = "http://example.com/alpha.xml";
pub(crate) const FEED_B: &str = "http://example.com/beta.xml";
pub(crate) const FEED_C: &str = "http://example.com/gamma.xml";
pub(crate) const FEED_D: &str = "http://example.com/delta.xml";

/// An RSS document titled `title`, with one item per `(guid, title, pubDate)`.
pub(crate) fn feed(title: &str, episodes: &[(&str, &str, &str)]) -> String {
    let image = title.to_lowercase();
    let items: String = episodes
        .iter()
        .map(|(guid, title, pubdate)| {
            format!(
                r#"<item><guid>{guid}</guid><title>{title}</title><pubDate>{pubdate}</pubDate><enclosure url="http://example.com/media/{guid}.mp3" type="audio/mpeg"/></item>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
<channel><title>{title}</title><itunes:author>{title} Author</itunes:author><itunes:image href="http://example.com/{image}.png"/>{items}</channel>
</rss>"#
    )
}

/// Serves Alpha, Beta and Gamma; Delta is unknown.
pub(crate) fn fetcher() -> MockFetcher {
    MockFetcher::default()
        .with_document(
            FEED_A,
            feed(
                "Alpha",
                &[
                    ("a-1", "Alpha one", "Mon, 01 Jan 2024 10:00:00 +0000"),
                    ("a-2", "Alpha two", "Tue, 02 Jan 2024 10:00:00 +0000"),
                ],
            ),
        )
        .with_document(
            FEED_B,
            feed(
                "Beta",
                &[
                    ("b-1", "Beta one", "Thu, 01 Feb 2024 10:00:00 +0000"),
                    ("b-2", "Beta two", "Fri, 02 Feb 2024 10:00:00 +0000"),
                ],
            ),
        )
        .with_document(FEED_C, feed("Gamma", &[("c-1", "Gamma one", "Fri, 01 Mar 2024 10:00:00 +0000")]))
}
