use derive_more::Display;
use std::collections::BTreeMap;

/// A searchable attribute.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    /// Any of the other text fields.
    #[display("any")]
    Any,
    #[display("podcast_title")]
    PodcastTitle,
    #[display("episode_title")]
    EpisodeTitle,
    #[display("podcast_author")]
    PodcastAuthor,
    #[display("episode_author")]
    EpisodeAuthor,
    #[display("category")]
    Category,
    /// Episode publication date (`YYYY-MM-DD`).
    #[display("pubdate")]
    PubDate,
    #[display("description")]
    Description,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Self::Any,
        Self::PodcastTitle,
        Self::EpisodeTitle,
        Self::PodcastAuthor,
        Self::EpisodeAuthor,
        Self::Category,
        Self::PubDate,
        Self::Description,
    ];

    /// Look a field up by its canonical name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.to_string() == name)
    }

    /// Column of `ftpodcast` holding this field. `None` if podcasts don't
    /// have it; `Some("")` stands for the whole row.
    pub(crate) fn podcast_column(self) -> Option<&'static str> {
        match self {
            Self::Any => Some(""),
            Self::PodcastTitle => Some("title"),
            Self::PodcastAuthor => Some("author"),
            Self::Category => Some("category"),
            Self::Description => Some("description"),
            Self::EpisodeTitle | Self::EpisodeAuthor | Self::PubDate => None,
        }
    }

    /// Column filter on `ftepisode` for this field.
    pub(crate) fn episode_columns(self) -> &'static str {
        match self {
            Self::Any => "{episode_title episode_author description}",
            Self::PodcastTitle => "podcast_title",
            Self::EpisodeTitle => "episode_title",
            Self::PodcastAuthor => "podcast_author",
            Self::EpisodeAuthor => "episode_author",
            Self::Category => "category",
            Self::PubDate => "pubdate",
            Self::Description => "description",
        }
    }

    /// Whether the field says something about episodes themselves, rather
    /// than only about the podcast they belong to.
    pub(crate) fn is_episode_level(self) -> bool {
        !matches!(self, Self::PodcastTitle | Self::PodcastAuthor | Self::Category)
    }
}

/// Search parameters: at most one value per field.
///
/// In exact mode the values are compared for equality. Otherwise each value
/// is an FTS5 query expression (usually a space-separated list of quoted
/// phrases) restricted to the field's column(s).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub exact: bool,
    values: BTreeMap<Field, String>,
}

impl SearchParams {
    pub fn exact() -> Self {
        Self { exact: true, values: BTreeMap::new() }
    }

    pub fn fulltext() -> Self {
        Self { exact: false, values: BTreeMap::new() }
    }

    /// Set the value for a field, replacing any previous value.
    pub fn set(&mut self, field: Field, value: impl Into<String>) -> &mut Self {
        self.values.insert(field, value.into());
        self
    }

    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fields in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.values.iter().map(|(field, value)| (*field, value.as_str()))
    }
}

/// An attribute whose distinct values can be listed.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Projection {
    #[display("episode_title")]
    EpisodeTitle,
    #[display("episode_author")]
    EpisodeAuthor,
    #[display("podcast_author")]
    PodcastAuthor,
    #[display("podcast_title")]
    PodcastTitle,
    /// Episode publication dates as `YYYY-MM-DD`.
    #[display("date")]
    Date,
    #[display("category")]
    Category,
}

impl Projection {
    pub(crate) fn expression(self) -> &'static str {
        match self {
            Self::EpisodeTitle => "e.title",
            Self::EpisodeAuthor => "e.author",
            Self::PodcastAuthor => "p.author",
            Self::PodcastTitle => "p.title",
            Self::Date => "date(e.pubdate, 'unixepoch')",
            Self::Category => "p.category",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(&field.to_string()), Some(field));
        }
        assert_eq!(Field::from_name("album"), None);
    }

    #[test]
    fn test_later_value_replaces_earlier() {
        let params = SearchParams::exact().with(Field::Category, "News").with(Field::Category, "Comedy");
        assert_eq!(params.get(Field::Category), Some("Comedy"));
        assert_eq!(params.iter().count(), 1);
    }

    #[test]
    fn test_podcast_columns() {
        let podcast_fields: Vec<_> = Field::ALL.into_iter().filter(|f| f.podcast_column().is_some()).collect();
        assert_eq!(
            podcast_fields,
            [Field::Any, Field::PodcastTitle, Field::PodcastAuthor, Field::Category, Field::Description]
        );
        assert!(Field::Description.is_episode_level());
        assert!(!Field::Category.is_episode_level());
    }
}
