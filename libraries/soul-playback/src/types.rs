//! Core types for playback state

use serde::{Deserialize, Serialize};
use soul_timeline::{MediaItem, Uid};

/// Player lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    /// Not prepared, or stopped
    #[default]
    Idle,

    /// Waiting for enough data to play
    Buffering,

    /// Able to play immediately
    Ready,

    /// Finished the playlist
    Ended,
}

/// Reason playback is held back although play-when-ready is set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SuppressionReason {
    #[default]
    None,
    TransientAudioFocusLoss,
    UnsuitableAudioOutput,
}

/// Playback speed and pitch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackParameters {
    pub speed: f32,
    pub pitch: f32,
}

impl PlaybackParameters {
    pub const DEFAULT: PlaybackParameters = PlaybackParameters {
        speed: 1.0,
        pitch: 1.0,
    };

    pub fn new(speed: f32, pitch: f32) -> Self {
        Self { speed, pitch }
    }
}

impl Default for PlaybackParameters {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Why the playback position jumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiscontinuityReason {
    /// Playback moved on to the next period or ad by itself
    AutoTransition,
    /// Caller requested a seek
    Seek,
    /// The playing period was removed from the playlist
    Remove,
    /// Internal adjustment by the engine
    Internal,
}

/// Why the active media item changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaItemTransitionReason {
    /// Same item entered again (repeat)
    Repeat,
    /// Playback moved on to the next item
    Auto,
    /// Caller seeked to another item
    Seek,
    /// Playlist edit changed the current item
    PlaylistChanged,
}

/// Why the timeline changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimelineChangeReason {
    /// Caller edited the playlist
    PlaylistChanged,
    /// A source reported new structure
    SourceUpdate,
}

/// Why play-when-ready changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlayWhenReadyChangeReason {
    #[default]
    UserRequest,
    AudioFocusLoss,
    AudioBecomingNoisy,
    Remote,
    EndOfMediaItem,
}

/// Track type handled by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    Audio,
    Video,
    Text,
    Metadata,
}

/// Renderer capability for a format
///
/// Ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatSupport {
    /// Renderer does not handle this track type at all
    UnsupportedType,
    /// Right track type but the codec or container is not supported
    UnsupportedSubtype,
    /// Format can be rendered
    Handled,
}

/// How video is fitted into its output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoScalingMode {
    #[default]
    ScaleToFit,
    ScaleToFitWithCropping,
}

/// Position details reported with a discontinuity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionInfo {
    pub window_uid: Option<Uid>,
    pub media_item_index: usize,
    pub media_item: Option<MediaItem>,
    pub period_uid: Option<Uid>,
    pub period_index: Option<usize>,
    pub position_ms: i64,
    pub content_position_ms: i64,
    pub ad_group_index: Option<usize>,
    pub ad_index_in_ad_group: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_support_orders_by_capability() {
        assert!(FormatSupport::Handled > FormatSupport::UnsupportedSubtype);
        assert!(FormatSupport::UnsupportedSubtype > FormatSupport::UnsupportedType);
    }

    #[test]
    fn default_parameters_are_unity() {
        let params = PlaybackParameters::default();
        assert_eq!(params.speed, 1.0);
        assert_eq!(params.pitch, 1.0);
        assert_eq!(PlaybackState::default(), PlaybackState::Idle);
    }
}
