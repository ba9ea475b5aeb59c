//! Schema migrations driven by `PRAGMA user_version`.
//!
//! Version 0 (a brand new database) gets the full schema in one go, older
//! databases are walked forward one upgrade script at a time. Every script is
//! responsible for bumping `user_version` itself.

use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use sqlx::SqlitePool;
use tracing::instrument;

/// The schema version this build reads and writes.
pub const SCHEMA_VERSION: i64 = 2;

pub(crate) struct Migrations {
    pub target: i64,
    /// Creates the `target` schema from scratch.
    pub baseline: &'static str,
    /// Upgrade scripts keyed by the version they upgrade *from*.
    pub upgrades: &'static [(i64, &'static str)],
}

pub(crate) const MIGRATIONS: Migrations = Migrations {
    target: SCHEMA_VERSION,
    baseline: include_str!("../migrations/schema.sql"),
    upgrades: &[(1, include_str!("../migrations/upgrade-v1.sql"))],
};

async fn user_version(pool: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .or_raise(|| ErrorKind::Database)
}

impl Migrations {
    fn script(&self, version: i64) -> Option<&'static str> {
        match version {
            0 => Some(self.baseline),
            _ => self.upgrades.iter().find(|(from, _)| *from == version).map(|(_, script)| *script),
        }
    }

    /// Bring the database up to the target version, returning it.
    #[instrument("performing database migrations", skip_all, fields(target = self.target))]
    pub(crate) async fn run(&self, pool: &SqlitePool) -> Result<i64> {
        let mut version = user_version(pool).await?;
        while version != self.target {
            let script = self.script(version).ok_or_raise(|| ErrorKind::Migration)?;
            if version == 0 {
                tracing::info!(version = self.target, "creating database schema");
            } else {
                tracing::info!(from = version, "upgrading database schema");
            }
            let mut tx = pool.begin().await.or_raise(|| ErrorKind::Database)?;
            sqlx::raw_sql(script).execute(&mut *tx).await.or_raise(|| ErrorKind::Migration)?;
            tx.commit().await.or_raise(|| ErrorKind::Database)?;

            let upgraded = user_version(pool).await?;
            if upgraded == version {
                tracing::error!(version, "migration script did not change the schema version");
                exn::bail!(ErrorKind::Migration);
            }
            version = upgraded;
        }
        tracing::debug!(version, "using database schema");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Entry, Field, Repository, SearchParams};
    use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

    const FEED: &str = "http://example.com/feed.xml";

    /// What a database written by the previous release looks like.
    const SCHEMA_V1: &str = r#"
        CREATE TABLE podcast (
            uri TEXT PRIMARY KEY NOT NULL, title TEXT, link TEXT, copyright TEXT,
            language TEXT, author TEXT, block INTEGER NOT NULL DEFAULT 0,
            category TEXT, image TEXT, explicit INTEGER,
            complete INTEGER NOT NULL DEFAULT 0, description TEXT, pubdate INTEGER
        );
        CREATE TABLE episode (
            podcast TEXT NOT NULL REFERENCES podcast (uri) ON DELETE CASCADE,
            guid TEXT NOT NULL, title TEXT, pubdate INTEGER, author TEXT,
            block INTEGER NOT NULL DEFAULT 0, image TEXT, duration REAL,
            explicit INTEGER, description TEXT,
            PRIMARY KEY (podcast, guid)
        );
        INSERT INTO podcast (uri, title) VALUES ('http://example.com/feed.xml', 'Kept');
        INSERT INTO episode (podcast, guid, title, pubdate)
        VALUES ('http://example.com/feed.xml', 'ep-1', 'Exam tips', 1704103200);
        PRAGMA user_version = 1;
    "#;

    async fn blank_pool() -> SqlitePool {
        // Same per-connection settings as the real index.
        let options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(true)
            .pragma("recursive_triggers", "ON");
        SqlitePoolOptions::new().max_connections(1).connect_with(options).await.unwrap()
    }

    async fn columns(pool: &SqlitePool, table: &str) -> Vec<String> {
        sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
            .bind(table)
            .fetch_all(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_fresh_database_reaches_current_version() {
        let pool = blank_pool().await;
        assert_eq!(MIGRATIONS.run(&pool).await.unwrap(), SCHEMA_VERSION);
        assert_eq!(user_version(&pool).await.unwrap(), SCHEMA_VERSION);
        assert!(columns(&pool, "episode").await.contains(&"media_uri".to_string()));
    }

    #[tokio::test]
    async fn test_running_twice_is_a_no_op() {
        let pool = blank_pool().await;
        MIGRATIONS.run(&pool).await.unwrap();
        assert_eq!(MIGRATIONS.run(&pool).await.unwrap(), SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_upgrade_from_v1() {
        let pool = blank_pool().await;
        sqlx::raw_sql(SCHEMA_V1).execute(&pool).await.unwrap();
        assert_eq!(MIGRATIONS.run(&pool).await.unwrap(), SCHEMA_VERSION);

        let episode = columns(&pool, "episode").await;
        for column in ["episode_order", "media_uri", "media_length", "media_type"] {
            assert!(episode.contains(&column.to_string()), "missing episode.{column}");
        }
        assert!(columns(&pool, "podcast").await.contains(&"new_feed_url".to_string()));
        let title: String = sqlx::query_scalar("SELECT title FROM podcast").fetch_one(&pool).await.unwrap();
        assert_eq!(title, "Kept");
    }

    #[tokio::test]
    async fn test_upgraded_database_supports_fulltext_search() {
        let pool = blank_pool().await;
        sqlx::raw_sql(SCHEMA_V1).execute(&pool).await.unwrap();
        MIGRATIONS.run(&pool).await.unwrap();
        let repo = Repository::new(pool.clone());
        let hits = |entries: Vec<Entry>| entries.into_iter().map(|e| (e.uri, e.guid)).collect::<Vec<_>>();

        // Rows written before the upgrade are indexed...
        let params = SearchParams::fulltext().with(Field::Any, "\"exam\"");
        let found = hits(repo.search(&params, 0, None).await.unwrap());
        assert_eq!(found, [(FEED.to_string(), Some("ep-1".to_string()))]);
        let params = SearchParams::fulltext().with(Field::PodcastTitle, "\"kep\"");
        let found = hits(repo.search(&params, 0, None).await.unwrap());
        assert_eq!(found, [(FEED.to_string(), None)]);

        // ...and the triggers keep the index in step from then on.
        assert!(repo.delete(FEED).await.unwrap());
        let params = SearchParams::fulltext().with(Field::Any, "\"exam\"");
        assert!(repo.search(&params, 0, None).await.unwrap().is_empty());
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ftpodcast").fetch_one(&pool).await.unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn test_script_must_advance_version() {
        let pool = blank_pool().await;
        let stuck = Migrations {
            target: 1,
            baseline: "CREATE TABLE podcast (uri TEXT PRIMARY KEY);",
            upgrades: &[],
        };
        let err = stuck.run(&pool).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Migration);
    }

    #[tokio::test]
    async fn test_unknown_version_is_rejected() {
        let pool = blank_pool().await;
        sqlx::raw_sql("PRAGMA user_version = 7;").execute(&pool).await.unwrap();
        let err = MIGRATIONS.run(&pool).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Migration);
    }

    #[tokio::test]
    async fn test_failing_script_is_rolled_back() {
        let pool = blank_pool().await;
        let broken = Migrations {
            target: 1,
            baseline: "CREATE TABLE podcast (uri TEXT PRIMARY KEY); SELECT * FROM missing; PRAGMA user_version = 1;",
            upgrades: &[],
        };
        let err = broken.run(&pool).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Migration);
        assert_eq!(user_version(&pool).await.unwrap(), 0);
        assert!(columns(&pool, "podcast").await.is_empty());
    }
}
