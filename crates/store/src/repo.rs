//! Repository for podcasts and their episodes.
//!
//! Podcasts and episodes are written as a unit: a podcast is only ever
//! replaced wholesale, together with all of its episodes, and deleting a
//! podcast cascades to its episodes (and, via triggers, to both full-text
//! indexes).

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Entry, EntryRow, EpisodeRow, PodcastRow};
use crate::params::{Field, Projection, SearchParams};
use castdex_feed::models::Podcast;
use exn::ResultExt;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::instrument;

/// Filters shared by the distinct-values query, numbered in [`Field::ALL`] order.
const DISTINCT_FILTERS: &str = r#"
   AND (?1 IS NULL OR ?1 IN (p.title, p.author, p.category, p.description, e.title, e.author, e.description))
   AND (?2 IS NULL OR ?2 = p.title)
   AND (?3 IS NULL OR ?3 = e.title)
   AND (?4 IS NULL OR ?4 = p.author)
   AND (?5 IS NULL OR ?5 = e.author)
   AND (?6 IS NULL OR ?6 = p.category)
   AND (?7 IS NULL OR date(e.pubdate, 'unixepoch') = date(?7))
   AND (?8 IS NULL OR ?8 = e.description OR ?8 = p.description)
"#;

#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// SQLite wants signed integers, and a negative limit means "no limit".
    fn window(offset: u64, limit: Option<u64>) -> Result<(i64, i64)> {
        let offset = i64::try_from(offset).or_raise(|| ErrorKind::InvalidData("offset"))?;
        let limit = limit.map(i64::try_from).transpose().or_raise(|| ErrorKind::InvalidData("limit"))?;
        Ok((offset, limit.unwrap_or(-1)))
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Store a podcast and all of its episodes, replacing what was stored
    /// before.
    ///
    /// Nothing is written when the stored copy has the same (known)
    /// publication date; returns whether anything was written. A podcast
    /// without a publication date is always rewritten.
    #[instrument(skip_all, fields(uri = %podcast.uri))]
    pub async fn update(&self, podcast: &Podcast) -> Result<bool> {
        let row = PodcastRow::from(podcast);
        let episodes = podcast.episodes.iter().map(EpisodeRow::try_from).collect::<Result<Vec<_>>>()?;

        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let stored: Option<Option<i64>> = sqlx::query_scalar(include_str!("../queries/get_pubdate.sql"))
            .bind(&row.uri)
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if row.pubdate.is_some() && stored == Some(row.pubdate) {
            tracing::debug!("podcast unchanged");
            return Ok(false);
        }

        sqlx::query(include_str!("../queries/delete_podcast.sql"))
            .bind(&row.uri)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/insert_podcast.sql"))
            .bind(&row.uri)
            .bind(row.title)
            .bind(row.link)
            .bind(row.copyright)
            .bind(row.language)
            .bind(row.author)
            .bind(row.block)
            .bind(row.category)
            .bind(row.image)
            .bind(row.explicit)
            .bind(row.complete)
            .bind(row.new_feed_url)
            .bind(row.description)
            .bind(row.pubdate)
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let count = episodes.len();
        for episode in episodes {
            sqlx::query(include_str!("../queries/insert_episode.sql"))
                .bind(&row.uri)
                .bind(episode.guid)
                .bind(episode.title)
                .bind(episode.pubdate)
                .bind(episode.author)
                .bind(episode.block)
                .bind(episode.image)
                .bind(episode.duration)
                .bind(episode.explicit)
                .bind(episode.order)
                .bind(episode.description)
                .bind(episode.media_uri)
                .bind(episode.media_length)
                .bind(episode.media_type)
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        tracing::debug!(episodes = count, replaced = stored.is_some(), "stored podcast");
        Ok(true)
    }

    /// Delete a podcast and its episodes. Returns whether it existed.
    pub async fn delete(&self, uri: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_podcast.sql"))
            .bind(uri.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every podcast whose URI is not in `keep`, returning how many
    /// were deleted. An empty `keep` deletes everything.
    #[instrument(skip_all, fields(keep = keep.len()))]
    pub async fn cleanup<S: AsRef<str>>(&self, keep: &[S]) -> Result<u64> {
        let mut query = QueryBuilder::<Sqlite>::new("DELETE FROM podcast");
        if !keep.is_empty() {
            query.push(" WHERE uri NOT IN (");
            let mut uris = query.separated(", ");
            for uri in keep {
                uris.push_bind(uri.as_ref().to_string());
            }
            uris.push_unseparated(")");
        }
        let result = query.build().execute(&self.pool).await.or_raise(|| ErrorKind::Database)?;
        let deleted = result.rows_affected();
        if deleted > 0 {
            tracing::info!(deleted, "removed podcasts no longer subscribed to");
        }
        Ok(deleted)
    }

    // =========================================================================
    // List
    // =========================================================================

    /// All podcasts, by title (case-insensitive).
    pub async fn list(&self, offset: u64, limit: Option<u64>) -> Result<Vec<Entry>> {
        let (offset, limit) = Self::window(offset, limit)?;
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_podcasts.sql"))
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    /// All episodes of one podcast, by title (case-insensitive).
    pub async fn list_episodes(&self, uri: impl AsRef<str>, offset: u64, limit: Option<u64>) -> Result<Vec<Entry>> {
        let (offset, limit) = Self::window(offset, limit)?;
        let rows: Vec<EntryRow> = sqlx::query_as(include_str!("../queries/list_episodes.sql"))
            .bind(uri.as_ref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(Entry::try_from).collect()
    }

    pub async fn list_uris(&self) -> Result<Vec<String>> {
        sqlx::query_scalar(include_str!("../queries/list_uris.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Podcasts and episodes matching `params`, most recently published first.
    #[instrument(skip(self))]
    pub async fn search(&self, params: &SearchParams, offset: u64, limit: Option<u64>) -> Result<Vec<Entry>> {
        let (offset, limit) = Self::window(offset, limit)?;
        let rows = if params.exact {
            self.indexed_search(params, offset, limit).await?
        } else {
            self.fulltext_search(params, offset, limit).await?
        };
        tracing::debug!(results = rows.len(), "search finished");
        rows.into_iter().map(Entry::try_from).collect()
    }

    async fn indexed_search(&self, params: &SearchParams, offset: i64, limit: i64) -> Result<Vec<EntryRow>> {
        let mut query = sqlx::query_as::<Sqlite, EntryRow>(include_str!("../queries/indexed_search.sql"));
        for field in Field::ALL {
            query = query.bind(params.get(field));
        }
        query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// FTS5 can't combine `MATCH` constraints with boolean operators, so
    /// every field gets its own sub-select and they're intersected per table.
    async fn fulltext_search(&self, params: &SearchParams, offset: i64, limit: i64) -> Result<Vec<EntryRow>> {
        let terms: Vec<(Field, &str)> = params.iter().collect();
        if terms.is_empty() || terms.iter().any(|(_, expression)| expression.trim().is_empty()) {
            return Ok(Vec::new());
        }
        let podcast_columns: Option<Vec<_>> = terms
            .iter()
            .map(|(field, expression)| field.podcast_column().map(|column| (column, *expression)))
            .collect();
        let episode_columns: Option<Vec<_>> = terms
            .iter()
            .any(|(field, _)| field.is_episode_level())
            .then(|| terms.iter().map(|(field, expression)| (field.episode_columns(), *expression)).collect());

        let mut query = QueryBuilder::<Sqlite>::new("");
        if let Some(columns) = &podcast_columns {
            query.push("SELECT uri AS uri, title AS title, NULL AS guid, pubdate AS pubdate FROM podcast WHERE rowid IN (");
            push_matches(&mut query, "ftpodcast", columns);
            query.push(")");
        }
        if let Some(columns) = &episode_columns {
            if podcast_columns.is_some() {
                query.push(" UNION ");
            }
            query.push("SELECT podcast AS uri, title AS title, guid AS guid, pubdate AS pubdate FROM episode WHERE rowid IN (");
            push_matches(&mut query, "ftepisode", columns);
            query.push(")");
        }
        if podcast_columns.is_none() && episode_columns.is_none() {
            return Ok(Vec::new());
        }
        query.push(" ORDER BY pubdate DESC, title, uri, guid LIMIT ");
        query.push_bind(limit);
        query.push(" OFFSET ");
        query.push_bind(offset);

        query
            .build_query_as::<EntryRow>()
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)
    }

    /// Sorted distinct non-null values of `projection` among the rows
    /// matching `params` (compared for equality, like an exact search).
    #[instrument(skip(self))]
    pub async fn distinct(&self, projection: Projection, params: &SearchParams) -> Result<Vec<String>> {
        let expression = projection.expression();
        let sql = format!(
            "SELECT DISTINCT {expression} AS value \
               FROM podcast AS p LEFT JOIN episode AS e ON e.podcast = p.uri \
              WHERE {expression} IS NOT NULL {DISTINCT_FILTERS} \
              ORDER BY value"
        );
        let mut query = sqlx::query_scalar::<Sqlite, String>(&sql);
        for field in Field::ALL {
            query = query.bind(params.get(field));
        }
        query.fetch_all(&self.pool).await.or_raise(|| ErrorKind::Database)
    }
}

/// `SELECT rowid FROM <table> WHERE <table> MATCH ? INTERSECT ...`, with the
/// column filter folded into the bound match expression.
fn push_matches(query: &mut QueryBuilder<'_, Sqlite>, table: &'static str, columns: &[(&'static str, &str)]) {
    for (index, (column, expression)) in columns.iter().enumerate() {
        if index > 0 {
            query.push(" INTERSECT ");
        }
        query.push("SELECT rowid FROM ").push(table).push(" WHERE ").push(table).push(" MATCH ");
        let expression = match *column {
            "" => expression.to_string(),
            column => format!("{column} : ({expression})"),
        };
        query.push_bind(expression);
    }
}
