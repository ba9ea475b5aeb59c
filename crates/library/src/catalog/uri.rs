//! Catalog URIs.
//!
//! - `podcast:` is the root directory.
//! - `podcast+<feed URL>` is a podcast (an album).
//! - `podcast+<feed URL>#<GUID>` is an episode (a track), with the GUID
//!   percent-encoded into the fragment.

use crate::error::{ErrorKind, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

pub const ROOT_URI: &str = "podcast:";
pub const SCHEME: &str = "podcast";

/// Everything allowed verbatim in a URI fragment: unreserved characters,
/// sub-delimiters, `:`, `@`, `/` and `?`.
const FRAGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/')
    .remove(b'?');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogUri<'a> {
    Root,
    Album { feed: &'a str },
    Track { feed: &'a str, guid: String },
}

impl<'a> CatalogUri<'a> {
    pub fn parse(uri: &'a str) -> Result<Self> {
        if uri == ROOT_URI {
            return Ok(Self::Root);
        }
        let invalid = || exn::Exn::from(ErrorKind::InvalidUri(uri.to_string()));
        let rest = uri.strip_prefix(SCHEME).and_then(|rest| rest.strip_prefix('+')).ok_or_else(invalid)?;
        match rest.split_once('#') {
            None if !rest.is_empty() => Ok(Self::Album { feed: rest }),
            Some((feed, fragment)) if !feed.is_empty() && !fragment.is_empty() => {
                let guid = percent_decode_str(fragment).decode_utf8().map_err(|_| invalid())?;
                Ok(Self::Track { feed, guid: guid.into_owned() })
            },
            _ => Err(invalid()),
        }
    }

    /// The feed URL, unless this is the root.
    pub fn feed(&self) -> Option<&'a str> {
        match self {
            Self::Root => None,
            Self::Album { feed } | Self::Track { feed, .. } => Some(*feed),
        }
    }
}

pub fn album_uri(feed: &str) -> String {
    let feed = feed.split_once('#').map_or(feed, |(head, _)| head);
    format!("{SCHEME}+{feed}")
}

pub fn track_uri(feed: &str, guid: &str) -> String {
    format!("{}#{}", album_uri(feed), utf8_percent_encode(guid, FRAGMENT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const FEED: &str = "http://example.com/feed.xml?id=1";

    #[rstest]
    #[case("ep-1", "ep-1")]
    #[case("tag:example.com,2024:ep/1?x=y", "tag:example.com,2024:ep/1?x=y")]
    #[case("a b#c", "a%20b%23c")]
    #[case("ünï", "%C3%BCn%C3%AF")]
    fn test_track_uri(#[case] guid: &str, #[case] fragment: &str) {
        let uri = track_uri(FEED, guid);
        assert_eq!(uri, format!("podcast+{FEED}#{fragment}"));
        assert_eq!(CatalogUri::parse(&uri).unwrap(), CatalogUri::Track { feed: FEED, guid: guid.to_string() });
    }

    #[test]
    fn test_album_uri_drops_fragment() {
        assert_eq!(album_uri("http://example.com/feed.xml#top"), "podcast+http://example.com/feed.xml");
    }

    #[test]
    fn test_parse() {
        assert_eq!(CatalogUri::parse("podcast:").unwrap(), CatalogUri::Root);
        let album = CatalogUri::parse("podcast+http://example.com/feed.xml").unwrap();
        assert_eq!(album, CatalogUri::Album { feed: "http://example.com/feed.xml" });
        assert_eq!(album.feed(), Some("http://example.com/feed.xml"));
    }

    #[rstest]
    #[case("file:///music")]
    #[case("podcast+")]
    #[case("podcast+http://example.com/feed.xml#")]
    #[case("podcasts+http://example.com/feed.xml")]
    #[case("podcast+http://example.com/feed.xml#%FF")]
    fn test_parse_invalid(#[case] uri: &str) {
        assert_eq!(*CatalogUri::parse(uri).unwrap_err(), ErrorKind::InvalidUri(uri.to_string()));
    }
}
