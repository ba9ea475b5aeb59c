use std::fmt::{Display, Formatter, Result as FmtResult};

/// Discriminator of an OPML outline element (its `type` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutlineKind {
    /// A subscription to a syndication feed (`type="rss"`).
    Rss,
    /// Another OPML document to be included (`type="include"`).
    Include,
    /// A plain web link (`type="link"`).
    Link,
    /// No `type` attribute; usually a folder of other outlines.
    Untyped,
}
impl OutlineKind {
    /// Maps an OPML `type` attribute to a kind, case-insensitively. Returns
    /// `None` for types that aren't supported.
    pub fn from_attribute(value: Option<&str>) -> Option<Self> {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") => Some(Self::Untyped),
            Some("rss") => Some(Self::Rss),
            Some("include") => Some(Self::Include),
            Some("link") => Some(Self::Link),
            Some(_) => None,
        }
    }
}
impl Display for OutlineKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(match self {
            Self::Rss => "rss",
            Self::Include => "include",
            Self::Link => "link",
            Self::Untyped => "",
        })
    }
}

/// One entry in an OPML subscription list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outline {
    pub kind: OutlineKind,
    pub text: Option<String>,
    pub title: Option<String>,
    pub category: Option<String>,
    /// `xmlUrl` for feed subscriptions, `url` for includes and links.
    pub uri: Option<String>,
}
impl Outline {
    /// The feed URI, but only for outlines that reference a feed.
    pub fn feed_uri(&self) -> Option<&str> {
        match self.kind {
            OutlineKind::Rss => self.uri.as_deref(),
            _ => None,
        }
    }
}
