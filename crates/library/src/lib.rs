//! Keeping the podcast index fresh, and answering catalog queries from it.
//!
//! - [`cache`]: parsed feeds in memory, loaded at most once at a time.
//! - [`refresh`]: the background task walking the feed set on a timer.
//! - [`translate`]: catalog queries to store search parameters.
//! - [`catalog`]: podcasts as albums, episodes as tracks.

pub mod cache;
pub mod catalog;
pub mod error;
pub mod import;
pub mod refresh;
#[cfg(test)]
mod testing;
pub mod translate;

pub use crate::cache::{FeedCache, FeedLoader, RssLoader};
pub use crate::catalog::Catalog;
pub use crate::refresh::{CycleReport, RefreshContext, RefreshHandle, RefreshScheduler};
pub use crate::translate::{Query, Term};
