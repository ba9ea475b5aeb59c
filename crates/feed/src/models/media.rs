/// The media object (usually the audio stream) attached to an [`Episode`](super::Episode).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enclosure {
    /// Location of the media object.
    pub uri: Option<String>,
    /// Size of the media object in bytes.
    pub length: Option<u64>,
    /// MIME type, for example `audio/mpeg`.
    pub mime_type: Option<String>,
}

/// Artwork for a podcast or an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub uri: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}
impl Image {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into(), width: None, height: None }
    }
}
