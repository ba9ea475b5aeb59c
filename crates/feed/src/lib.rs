//! Podcast feed documents: RSS feeds and OPML subscription lists.
//!
//! Everything here is pure. Bytes in, models out; fetching documents is
//! `castdex-fetch`'s job and remembering them is `castdex-store`'s.

pub mod error;
pub mod models;
pub mod opml;
pub mod rss;

pub use self::models::{Episode, Outline, OutlineKind, Podcast, validate_uri};
