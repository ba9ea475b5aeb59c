//! Opening the index database.

use exn::ResultExt;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::time::Duration;

use crate::error::{ErrorKind, Result};
use crate::migrate::MIGRATIONS;

// The refresh task writes, catalog queries read alongside it.
const MAX_CONNECTIONS: u32 = 4;
// Replacing a feed with thousands of episodes holds the write lock a while.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// The podcast index: a SQLite pool whose schema is at
/// [`SCHEMA_VERSION`](crate::SCHEMA_VERSION).
///
/// Hand it to [`Repository`](crate::Repository) to read or write podcasts.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the index at `path`, creating the file if needed, and migrate it.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let options = Self::options()
            .filename(path.as_ref())
            .create_if_missing(true)
            // Readers keep going while a refresh rewrites a podcast.
            .journal_mode(SqliteJournalMode::Wal);
        Self::open(options, MAX_CONNECTIONS).await
    }

    /// Open a private, empty index that lives as long as its connection.
    ///
    /// Not behind `#[cfg(test)]`: the library crate builds its test fixtures
    /// on top of it.
    pub async fn connect_in_memory() -> Result<Self> {
        // Each connection to ":memory:" is a database of its own.
        Self::open(Self::options().filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let version = MIGRATIONS.run(&pool).await?;
        tracing::debug!(version, "opened podcast index");
        Ok(Self { pool })
    }

    /// Per-connection settings the repository depends on.
    fn options() -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            // Deleting a podcast removes its episodes through the cascade.
            .foreign_keys(true)
            // Rows replaced by a conflict still fire the full-text delete triggers.
            .pragma("recursive_triggers", "ON")
            // The index can always be rebuilt from the feeds.
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(BUSY_TIMEOUT)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for outstanding queries, then close every connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "http://example.com/feed.xml";

    async fn count(pool: &SqlitePool, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}")).fetch_one(pool).await.unwrap()
    }

    async fn insert_podcast_with_episode(pool: &SqlitePool) {
        sqlx::raw_sql(
            "INSERT INTO podcast (uri, title) VALUES ('http://example.com/feed.xml', 'Example');
             INSERT INTO episode (podcast, guid, title) VALUES ('http://example.com/feed.xml', 'ep-1', 'One');",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_delete_cascades_through_triggers() {
        let db = Database::connect_in_memory().await.unwrap();
        insert_podcast_with_episode(db.pool()).await;
        assert_eq!(count(db.pool(), "ftepisode").await, 1);

        sqlx::query("DELETE FROM podcast WHERE uri = ?").bind(FEED).execute(db.pool()).await.unwrap();
        for table in ["episode", "ftpodcast", "ftepisode"] {
            assert_eq!(count(db.pool(), table).await, 0, "{table} not emptied");
        }
    }

    #[tokio::test]
    async fn test_episode_requires_podcast() {
        let db = Database::connect_in_memory().await.unwrap();
        let result = sqlx::query("INSERT INTO episode (podcast, guid) VALUES (?, 'ep-1')")
            .bind(FEED)
            .execute(db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feeds.db");
        let db = Database::connect(&path).await.unwrap();
        let mode: String = sqlx::query_scalar("PRAGMA journal_mode").fetch_one(db.pool()).await.unwrap();
        assert_eq!(mode, "wal");

        // Every pooled connection gets the settings, not just the first one.
        let mut first = db.pool().acquire().await.unwrap();
        let mut second = db.pool().acquire().await.unwrap();
        for conn in [&mut first, &mut second] {
            let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys").fetch_one(&mut **conn).await.unwrap();
            assert_eq!(enabled, 1);
            let recursive: i64 = sqlx::query_scalar("PRAGMA recursive_triggers").fetch_one(&mut **conn).await.unwrap();
            assert_eq!(recursive, 1);
        }
        drop((first, second));

        insert_podcast_with_episode(db.pool()).await;
        db.close().await;

        let db = Database::connect(&path).await.unwrap();
        assert_eq!(count(db.pool(), "ftpodcast").await, 1);
        assert_eq!(count(db.pool(), "episode").await, 1);
        db.close().await;
    }

    #[tokio::test]
    async fn test_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Database::connect(dir.path().join("missing").join("feeds.db")).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Database);
    }
}
