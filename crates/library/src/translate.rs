//! Translation of catalog queries into store search parameters.
//!
//! Catalog clients speak in their own vocabulary (`album`, `artist`,
//! `track_name`, ...); the store only knows [`Field`]s. Both the canonical
//! field names and the catalog aliases are accepted, anything else is
//! rejected rather than silently ignored.

use crate::error::{ErrorKind, Result};
use castdex_store::{Field, Projection, SearchParams};
use serde::{Deserialize, Serialize};

/// A field and the values to search it for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub terms: Vec<Term>,
    /// Exact (indexed) matching instead of full-text matching.
    #[serde(default)]
    pub exact: bool,
}

impl Query {
    pub fn new(exact: bool) -> Self {
        Self { terms: Vec::new(), exact }
    }

    pub fn with<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.terms.push(Term {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }
}

fn field(name: &str) -> Option<Field> {
    let field = match name {
        "album" => Field::PodcastTitle,
        "track_name" => Field::EpisodeTitle,
        "albumartist" => Field::PodcastAuthor,
        "artist" => Field::EpisodeAuthor,
        "genre" => Field::Category,
        "date" => Field::PubDate,
        "comment" => Field::Description,
        other => return Field::from_name(other),
    };
    Some(field)
}

/// Quote a value as an FTS5 phrase. FTS5 has no escape for its operator
/// characters, so they're blanked out.
fn phrase(value: &str) -> String {
    let cleaned: String = value.chars().map(|c| if matches!(c, '"' | '^' | '*') { ' ' } else { c }).collect();
    format!("\"{cleaned}\"")
}

/// Convert a query into search parameters.
///
/// Exact queries can't match a field against several values, so multiple
/// values are concatenated into one. Full-text queries turn each value into
/// a quoted phrase, and a field matches when all of its phrases do. When a
/// field is given more than once, the last term wins.
pub fn translate(query: &Query) -> Result<SearchParams> {
    let mut params = if query.exact { SearchParams::exact() } else { SearchParams::fulltext() };
    for term in &query.terms {
        let Some(field) = field(&term.field) else {
            exn::bail!(ErrorKind::UnsupportedField(term.field.clone()));
        };
        let value = if query.exact {
            term.values.concat()
        } else {
            term.values.iter().map(|v| phrase(v)).collect::<Vec<_>>().join(" ")
        };
        params.set(field, value);
    }
    Ok(params)
}

/// Map a catalog field name to the projection listing its distinct values.
pub fn translate_projection(name: &str) -> Result<Projection> {
    Ok(match name {
        "track" => Projection::EpisodeTitle,
        "artist" => Projection::EpisodeAuthor,
        "albumartist" => Projection::PodcastAuthor,
        "album" => Projection::PodcastTitle,
        "date" => Projection::Date,
        "genre" => Projection::Category,
        other => exn::bail!(ErrorKind::UnsupportedField(other.to_string())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("album", Field::PodcastTitle)]
    #[case("podcast_title", Field::PodcastTitle)]
    #[case("track_name", Field::EpisodeTitle)]
    #[case("albumartist", Field::PodcastAuthor)]
    #[case("artist", Field::EpisodeAuthor)]
    #[case("episode_author", Field::EpisodeAuthor)]
    #[case("genre", Field::Category)]
    #[case("date", Field::PubDate)]
    #[case("comment", Field::Description)]
    #[case("any", Field::Any)]
    fn test_field_aliases(#[case] name: &str, #[case] expected: Field) {
        let params = translate(&Query::new(true).with(name, ["x"])).unwrap();
        assert_eq!(params.get(expected), Some("x"));
    }

    #[rstest]
    #[case::exact(true)]
    #[case::fulltext(false)]
    fn test_unsupported_field(#[case] exact: bool) {
        let query = Query::new(exact).with("album", ["x"]).with("bitrate", ["320"]);
        let err = translate(&query).unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedField("bitrate".to_string()));
    }

    #[test]
    fn test_exact_values_are_concatenated() {
        let params = translate(&Query::new(true).with("artist", ["Jane ", "Doe"])).unwrap();
        assert!(params.exact);
        assert_eq!(params.get(Field::EpisodeAuthor), Some("Jane Doe"));
    }

    #[rstest]
    #[case(&["exam"], r#""exam""#)]
    #[case(&["red", "blue"], r#""red" "blue""#)]
    #[case(&[r#"say "hi"*^"#], r#""say  hi   ""#)]
    fn test_fulltext_phrases(#[case] values: &[&str], #[case] expected: &str) {
        let params = translate(&Query::new(false).with("any", values.iter().copied())).unwrap();
        assert!(!params.exact);
        assert_eq!(params.get(Field::Any), Some(expected));
    }

    #[test]
    fn test_later_term_wins() {
        let query = Query::new(true).with("album", ["First"]).with("podcast_title", ["Second"]);
        assert_eq!(translate(&query).unwrap().get(Field::PodcastTitle), Some("Second"));
    }

    #[test]
    fn test_empty_query() {
        assert!(translate(&Query::default()).unwrap().is_empty());
    }

    #[rstest]
    #[case("track", Projection::EpisodeTitle)]
    #[case("artist", Projection::EpisodeAuthor)]
    #[case("albumartist", Projection::PodcastAuthor)]
    #[case("album", Projection::PodcastTitle)]
    #[case("date", Projection::Date)]
    #[case("genre", Projection::Category)]
    fn test_projections(#[case] name: &str, #[case] expected: Projection) {
        assert_eq!(translate_projection(name).unwrap(), expected);
    }

    #[test]
    fn test_unsupported_projection() {
        let err = translate_projection("comment").unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedField("comment".to_string()));
    }
}
