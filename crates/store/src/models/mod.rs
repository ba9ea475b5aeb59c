mod entry;
mod podcast;

pub use self::entry::Entry;
pub(crate) use self::entry::EntryRow;
pub(crate) use self::podcast::{EpisodeRow, PodcastRow};
