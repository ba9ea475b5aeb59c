//! Discovery of subscriptions from OPML files.

use castdex_feed::{opml, validate_uri};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Collect the feed URIs of every `rss` outline in the `.opml` files directly
/// inside `dir`.
///
/// Files are read in name order. A file that can't be read or parsed is
/// logged and skipped, as is a missing directory.
pub async fn scan(dir: &Path) -> Vec<String> {
    let mut files = match list(dir).await {
        Ok(files) => files,
        Err(err) => {
            tracing::warn!(dir = %dir.display(), error = %err, "cannot scan import directory");
            return Vec::new();
        },
    };
    files.sort();

    let mut feeds = Vec::new();
    for path in files {
        let data = match tokio::fs::read(&path).await {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "cannot read subscription list");
                continue;
            },
        };
        let outlines = match opml::parse(&data) {
            Ok(outlines) => outlines,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = ?err, "cannot parse subscription list");
                continue;
            },
        };
        let before = feeds.len();
        for outline in outlines.iter().filter(|o| o.kind == castdex_feed::OutlineKind::Rss) {
            match outline.feed_uri() {
                Some(uri) => feeds.push(uri.to_string()),
                None => tracing::warn!(
                    path = %path.display(),
                    text = outline.text.as_deref(),
                    "subscription without feed URL"
                ),
            }
        }
        tracing::debug!(path = %path.display(), feeds = feeds.len() - before, "imported subscriptions");
    }
    feeds
}

async fn list(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_opml = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("opml"));
        if is_opml && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    Ok(files)
}

/// Combine configured and imported feeds: configured ones first, duplicates
/// and invalid URIs dropped, fragments stripped.
pub fn merge<S: AsRef<str>>(configured: &[S], imported: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    configured
        .iter()
        .chain(imported)
        .filter_map(|uri| match validate_uri(uri.as_ref()) {
            Ok(uri) => Some(uri),
            Err(err) => {
                tracing::warn!(uri = uri.as_ref(), error = %*err, "ignoring invalid feed URI");
                None
            },
        })
        .filter(|uri| seen.insert(uri.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIRST: &str = r#"<?xml version="1.0"?>
<opml version="2.0">
  <body>
    <outline text="Tech">
      <outline type="rss" text="Alpha" xmlUrl="http://example.com/a.xml"/>
      <outline type="rss" text="Broken"/>
    </outline>
    <outline type="link" text="Site" url="http://example.com/"/>
  </body>
</opml>"#;

    const SECOND: &str = r#"<opml><body><outline type="RSS" xmlUrl="http://example.com/b.xml"/></body></opml>"#;

    #[tokio::test]
    async fn test_scan() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2-second.OPML"), SECOND).unwrap();
        std::fs::write(dir.path().join("1-first.opml"), FIRST).unwrap();
        std::fs::write(dir.path().join("broken.opml"), "<opml><body>").unwrap();
        std::fs::write(dir.path().join("notes.txt"), FIRST).unwrap();
        std::fs::create_dir(dir.path().join("folder.opml")).unwrap();

        let feeds = scan(dir.path()).await;
        assert_eq!(feeds, vec!["http://example.com/a.xml", "http://example.com/b.xml"]);
    }

    #[tokio::test]
    async fn test_scan_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(scan(&dir.path().join("missing")).await.is_empty());
    }

    #[test]
    fn test_merge() {
        let configured = ["http://example.com/b.xml", "http://example.com/a.xml#top", "feed.xml"];
        let imported = ["http://example.com/a.xml", "http://example.com/c.xml", "http://example.com/b.xml"];
        assert_eq!(
            merge(&configured, &imported),
            vec!["http://example.com/b.xml", "http://example.com/a.xml", "http://example.com/c.xml"]
        );
    }
}
