mod episode;
mod media;
mod outline;
mod podcast;

pub use self::episode::Episode;
pub use self::media::{Enclosure, Image};
pub use self::outline::{Outline, OutlineKind};
pub use self::podcast::{Podcast, validate_uri};
