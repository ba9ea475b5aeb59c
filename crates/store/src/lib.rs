//! SQLite index of podcasts and episodes.
//!
//! The database is a derived index, not the source of truth: the feeds are.
//! Each refresh replaces a podcast and all of its episodes wholesale, and a
//! deleted database is rebuilt by the next refresh cycle.
//!
//! # Architecture
//! - **`podcast` / `episode`**: plain relational tables used for listing and
//!   exact (indexed) search. Episodes cascade with their podcast.
//! - **`ftpodcast` / `ftepisode`**: FTS5 tables kept in sync by triggers and
//!   sharing rowids with their source tables, used for full-text search.

mod db;
pub mod error;
mod migrate;
mod models;
mod params;
mod repo;

pub use crate::db::Database;
pub use crate::migrate::SCHEMA_VERSION;
pub use crate::models::Entry;
pub use crate::params::{Field, Projection, SearchParams};
pub use crate::repo::Repository;
