use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use time::UtcDateTime;

/// A listing or search hit: a podcast (no GUID) or one of its episodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Feed URI of the podcast.
    pub uri: String,
    pub title: Option<String>,
    /// Set for episodes only.
    pub guid: Option<String>,
    pub pubdate: Option<UtcDateTime>,
}
impl Entry {
    pub fn is_episode(&self) -> bool {
        self.guid.is_some()
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct EntryRow {
    uri: String,
    title: Option<String>,
    guid: Option<String>,
    pubdate: Option<i64>,
}
impl TryFrom<EntryRow> for Entry {
    type Error = Error;
    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            uri: row.uri,
            title: row.title,
            guid: row.guid,
            pubdate: row
                .pubdate
                .map(UtcDateTime::from_unix_timestamp)
                .transpose()
                .or_raise(|| ErrorKind::InvalidData("publication date"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_to_model() {
        let row = EntryRow {
            uri: "http://example.com/feed.xml".to_string(),
            title: Some("Episode One".to_string()),
            guid: Some("ep-1".to_string()),
            pubdate: Some(1704103200),
        };
        let entry = Entry::try_from(row).unwrap();
        assert!(entry.is_episode());
        assert_eq!(entry.pubdate.map(UtcDateTime::unix_timestamp), Some(1704103200));
    }

    #[test]
    fn test_out_of_range_timestamp() {
        let row = EntryRow {
            uri: "http://example.com/feed.xml".to_string(),
            title: None,
            guid: None,
            pubdate: Some(i64::MAX),
        };
        let err = Entry::try_from(row).unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidData("publication date"));
    }
}
