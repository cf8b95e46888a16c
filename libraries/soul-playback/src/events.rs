//! Player Events
//!
//! Every state transition produces zero or more [`PlayerEvent`]s. They are
//! queued in a [`NotificationBatcher`] while the transition is computed and
//! flushed to listeners as one batch afterwards, so no listener ever runs
//! against half-updated player state.
//!
//! Queue order is the delivery order:
//! - timeline, position discontinuity, media item transition
//! - error changed and raised, tracks, metadata, loading
//! - combined state, playback state, play-when-ready, suppression
//! - is-playing, playback parameters, seek processed
//! - available commands last

use crate::commands::Commands;
use crate::error::PlayerError;
use crate::snapshot::Tracks;
use crate::types::{
    DiscontinuityReason, MediaItemTransitionReason, PlayWhenReadyChangeReason,
    PlaybackParameters, PlaybackState, PositionInfo, SuppressionReason, TimelineChangeReason,
};
use soul_timeline::{MediaItem, MediaMetadata, RepeatMode, Timeline};
use std::sync::Arc;

/// Events delivered to player listeners
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Timeline replaced, by a playlist edit or a source update
    TimelineChanged {
        timeline: Arc<Timeline>,
        reason: TimelineChangeReason,
    },

    /// Position jumped other than by linear playback
    PositionDiscontinuity {
        old_position: PositionInfo,
        new_position: PositionInfo,
        reason: DiscontinuityReason,
    },

    /// Active media item changed, or the current item repeated
    MediaItemTransition {
        /// `None` once the playlist is empty
        media_item: Option<MediaItem>,
        reason: MediaItemTransitionReason,
    },

    /// Player error set or cleared
    PlayerErrorChanged { error: Option<PlayerError> },

    /// Player error raised; follows `PlayerErrorChanged` when an error is set
    PlayerError { error: PlayerError },

    TracksChanged { tracks: Tracks },

    /// Item metadata overlaid with metadata found in the stream
    MediaMetadataChanged { metadata: MediaMetadata },

    PlaylistMetadataChanged { metadata: MediaMetadata },

    IsLoadingChanged { is_loading: bool },

    /// Play-when-ready or playback state changed
    ///
    /// Kept for listeners that track both as one; it has no flag of its own.
    PlayerStateChanged {
        play_when_ready: bool,
        playback_state: PlaybackState,
    },

    PlaybackStateChanged { playback_state: PlaybackState },

    PlayWhenReadyChanged {
        play_when_ready: bool,
        reason: PlayWhenReadyChangeReason,
    },

    PlaybackSuppressionReasonChanged { reason: SuppressionReason },

    IsPlayingChanged { is_playing: bool },

    PlaybackParametersChanged { parameters: PlaybackParameters },

    /// A seek was handled; has no flag of its own
    SeekProcessed,

    RepeatModeChanged { repeat_mode: RepeatMode },

    ShuffleModeEnabledChanged { enabled: bool },

    AvailableCommandsChanged { commands: Commands },

    VolumeChanged { volume: f32 },

    AudioSessionIdChanged { audio_session_id: u32 },

    SkipSilenceEnabledChanged { enabled: bool },
}

/// Event category bit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum EventFlag {
    TimelineChanged = 1 << 0,
    PositionDiscontinuity = 1 << 1,
    MediaItemTransition = 1 << 2,
    PlayerErrorChanged = 1 << 3,
    TracksChanged = 1 << 4,
    MediaMetadataChanged = 1 << 5,
    PlaylistMetadataChanged = 1 << 6,
    IsLoadingChanged = 1 << 7,
    PlaybackStateChanged = 1 << 8,
    PlayWhenReadyChanged = 1 << 9,
    PlaybackSuppressionReasonChanged = 1 << 10,
    IsPlayingChanged = 1 << 11,
    PlaybackParametersChanged = 1 << 12,
    RepeatModeChanged = 1 << 13,
    ShuffleModeEnabledChanged = 1 << 14,
    AvailableCommandsChanged = 1 << 15,
    VolumeChanged = 1 << 16,
    AudioSessionIdChanged = 1 << 17,
    SkipSilenceEnabledChanged = 1 << 18,
}

impl PlayerEvent {
    /// Category flag, `None` for the combined-state and seek-processed events
    pub fn flag(&self) -> Option<EventFlag> {
        let flag = match self {
            PlayerEvent::TimelineChanged { .. } => EventFlag::TimelineChanged,
            PlayerEvent::PositionDiscontinuity { .. } => EventFlag::PositionDiscontinuity,
            PlayerEvent::MediaItemTransition { .. } => EventFlag::MediaItemTransition,
            PlayerEvent::PlayerErrorChanged { .. } | PlayerEvent::PlayerError { .. } => {
                EventFlag::PlayerErrorChanged
            }
            PlayerEvent::TracksChanged { .. } => EventFlag::TracksChanged,
            PlayerEvent::MediaMetadataChanged { .. } => EventFlag::MediaMetadataChanged,
            PlayerEvent::PlaylistMetadataChanged { .. } => EventFlag::PlaylistMetadataChanged,
            PlayerEvent::IsLoadingChanged { .. } => EventFlag::IsLoadingChanged,
            PlayerEvent::PlaybackStateChanged { .. } => EventFlag::PlaybackStateChanged,
            PlayerEvent::PlayWhenReadyChanged { .. } => EventFlag::PlayWhenReadyChanged,
            PlayerEvent::PlaybackSuppressionReasonChanged { .. } => {
                EventFlag::PlaybackSuppressionReasonChanged
            }
            PlayerEvent::IsPlayingChanged { .. } => EventFlag::IsPlayingChanged,
            PlayerEvent::PlaybackParametersChanged { .. } => EventFlag::PlaybackParametersChanged,
            PlayerEvent::RepeatModeChanged { .. } => EventFlag::RepeatModeChanged,
            PlayerEvent::ShuffleModeEnabledChanged { .. } => EventFlag::ShuffleModeEnabledChanged,
            PlayerEvent::AvailableCommandsChanged { .. } => EventFlag::AvailableCommandsChanged,
            PlayerEvent::VolumeChanged { .. } => EventFlag::VolumeChanged,
            PlayerEvent::AudioSessionIdChanged { .. } => EventFlag::AudioSessionIdChanged,
            PlayerEvent::SkipSilenceEnabledChanged { .. } => EventFlag::SkipSilenceEnabledChanged,
            PlayerEvent::PlayerStateChanged { .. } | PlayerEvent::SeekProcessed => return None,
        };
        Some(flag)
    }
}

/// Set of event categories delivered in one batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventFlags(u32);

impl EventFlags {
    pub fn insert(&mut self, flag: EventFlag) {
        self.0 |= flag as u32;
    }

    pub fn contains(&self, flag: EventFlag) -> bool {
        self.0 & flag as u32 != 0
    }

    pub fn contains_any(&self, flags: &[EventFlag]) -> bool {
        flags.iter().any(|f| self.contains(*f))
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }
}

/// Events of one transition, held back until the transition is complete
#[derive(Debug, Default)]
pub struct NotificationBatcher {
    queued: Vec<PlayerEvent>,
    flags: EventFlags,
}

impl NotificationBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&mut self, event: PlayerEvent) {
        if let Some(flag) = event.flag() {
            self.flags.insert(flag);
        }
        self.queued.push(event);
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Take the queued batch, leaving the batcher empty
    pub fn take(&mut self) -> (Vec<PlayerEvent>, EventFlags) {
        (
            std::mem::take(&mut self.queued),
            std::mem::take(&mut self.flags),
        )
    }
}
