//! Media item and repeat types shared by timelines and the player

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Repeat mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Stop when the playlist ends
    #[default]
    Off,

    /// Loop the current item only
    One,

    /// Loop the entire playlist
    All,
}

/// Descriptive metadata of a media item
///
/// Fields left `None` may be filled from metadata found inside the media.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub track_number: Option<u32>,
}

impl MediaMetadata {
    /// Metadata with no fields set
    pub const EMPTY: MediaMetadata = MediaMetadata {
        title: None,
        artist: None,
        album: None,
        track_number: None,
    };

    /// Fill fields that are still unset from `other`
    pub fn populate_from(mut self, other: &MediaMetadata) -> Self {
        if self.title.is_none() {
            self.title.clone_from(&other.title);
        }
        if self.artist.is_none() {
            self.artist.clone_from(&other.artist);
        }
        if self.album.is_none() {
            self.album.clone_from(&other.album);
        }
        if self.track_number.is_none() {
            self.track_number = other.track_number;
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }
}

/// One entry of the playlist as supplied by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Caller-defined identifier
    pub media_id: String,

    /// URI the execution engine loads from
    pub uri: String,

    /// Metadata supplied with the item
    pub metadata: MediaMetadata,

    /// Duration if known up front
    pub duration: Option<Duration>,
}

impl MediaItem {
    pub fn new(media_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            media_id: media_id.into(),
            uri: uri.into(),
            metadata: MediaMetadata::default(),
            duration: None,
        }
    }

    pub fn with_metadata(mut self, metadata: MediaMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}
