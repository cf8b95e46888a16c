//! Snapshot State
//!
//! [`PlaybackSnapshot`] is the immutable value the player exposes at an
//! instant. Every transition builds a new snapshot from the previous one with
//! the `with_*` methods; nothing mutates a published snapshot.
//!
//! All positions are microseconds. Conversion to milliseconds happens only in
//! the player's public getters.

use crate::error::PlayerError;
use crate::types::{
    FormatSupport, PlayWhenReadyChangeReason, PlaybackParameters, PlaybackState,
    SuppressionReason, TrackType,
};
use soul_timeline::{MediaMetadata, PeriodId, Timeline};
use std::sync::Arc;

/// Description of one track of a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Format {
    pub id: Option<String>,
    /// MIME type of the samples, e.g. `audio/flac`
    pub sample_mime_type: String,
    pub codecs: Option<String>,
    pub bitrate: Option<u32>,
}

impl Format {
    pub fn new(sample_mime_type: impl Into<String>) -> Self {
        Self {
            id: None,
            sample_mime_type: sample_mime_type.into(),
            codecs: None,
            bitrate: None,
        }
    }

    /// Track type implied by the MIME type
    pub fn track_type(&self) -> Option<TrackType> {
        let mime = self.sample_mime_type.as_str();
        match mime.split('/').next() {
            Some("audio") => Some(TrackType::Audio),
            Some("video") => Some(TrackType::Video),
            Some("text") => Some(TrackType::Text),
            _ if mime == "application/x-subrip" || mime == "application/ttml+xml" => {
                Some(TrackType::Text)
            }
            _ if mime == "application/id3" || mime == "application/x-emsg" => {
                Some(TrackType::Metadata)
            }
            _ => None,
        }
    }
}

/// Group of alternative tracks of one type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackGroup {
    pub track_type: TrackType,
    pub formats: Vec<Format>,
    /// Per-format renderer support, filled in by the player
    pub support: Vec<FormatSupport>,
    /// Per-format selection flag reported by the engine
    pub selected: Vec<bool>,
}

impl TrackGroup {
    pub fn new(track_type: TrackType, formats: Vec<Format>) -> Self {
        let len = formats.len();
        Self {
            track_type,
            formats,
            support: vec![FormatSupport::Handled; len],
            selected: vec![false; len],
        }
    }

    pub fn select(mut self, index: usize) -> Self {
        if let Some(flag) = self.selected.get_mut(index) {
            *flag = true;
        }
        self
    }

    pub fn is_selected(&self) -> bool {
        self.selected.iter().any(|s| *s)
    }

    pub fn is_supported(&self) -> bool {
        self.support.iter().any(|s| *s == FormatSupport::Handled)
    }
}

/// Tracks of the playing period
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tracks {
    pub groups: Vec<TrackGroup>,
}

impl Tracks {
    pub const EMPTY: Tracks = Tracks { groups: Vec::new() };

    pub fn new(groups: Vec<TrackGroup>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn is_type_selected(&self, track_type: TrackType) -> bool {
        self.groups
            .iter()
            .any(|g| g.track_type == track_type && g.is_selected())
    }
}

/// Full observable player state at an instant
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub timeline: Arc<Timeline>,
    pub period_id: PeriodId,
    /// Content position requested when an ad interrupted it, period-relative
    pub requested_content_position_us: Option<i64>,
    pub discontinuity_start_position_us: i64,
    pub playback_state: PlaybackState,
    pub playback_error: Option<PlayerError>,
    pub is_loading: bool,
    pub tracks: Tracks,
    pub static_metadata: Vec<MediaMetadata>,
    pub loading_period_id: PeriodId,
    pub play_when_ready: bool,
    pub play_when_ready_change_reason: PlayWhenReadyChangeReason,
    pub suppression_reason: SuppressionReason,
    pub playback_parameters: PlaybackParameters,
    pub offload_scheduling_enabled: bool,
    pub sleeping_for_offload: bool,
    /// Period-relative position up to which media is buffered
    pub buffered_position_us: i64,
    pub total_buffered_duration_us: i64,
    /// Period-relative playback position
    pub position_us: i64,
}

impl Default for PlaybackSnapshot {
    fn default() -> Self {
        Self::initial()
    }
}

impl PlaybackSnapshot {
    /// Idle player with an empty timeline
    pub fn initial() -> Self {
        Self {
            timeline: Arc::new(Timeline::empty()),
            period_id: PeriodId::dummy(),
            requested_content_position_us: None,
            discontinuity_start_position_us: 0,
            playback_state: PlaybackState::Idle,
            playback_error: None,
            is_loading: false,
            tracks: Tracks::EMPTY,
            static_metadata: Vec::new(),
            loading_period_id: PeriodId::dummy(),
            play_when_ready: false,
            play_when_ready_change_reason: PlayWhenReadyChangeReason::UserRequest,
            suppression_reason: SuppressionReason::None,
            playback_parameters: PlaybackParameters::DEFAULT,
            offload_scheduling_enabled: false,
            sleeping_for_offload: false,
            buffered_position_us: 0,
            total_buffered_duration_us: 0,
            position_us: 0,
        }
    }

    /// Move to a new playing position
    ///
    /// Buffered position is left alone; callers that know it set it
    /// explicitly.
    #[must_use]
    pub fn with_new_position(
        mut self,
        period_id: PeriodId,
        position_us: i64,
        requested_content_position_us: Option<i64>,
        discontinuity_start_position_us: i64,
        total_buffered_duration_us: i64,
    ) -> Self {
        self.period_id = period_id;
        self.position_us = position_us;
        self.requested_content_position_us = requested_content_position_us;
        self.discontinuity_start_position_us = discontinuity_start_position_us;
        self.total_buffered_duration_us = total_buffered_duration_us;
        self
    }

    /// Drop track and static metadata, used when the playing period changes
    #[must_use]
    pub fn without_tracks(mut self) -> Self {
        self.tracks = Tracks::EMPTY;
        self.static_metadata = Vec::new();
        self
    }

    #[must_use]
    pub fn with_timeline(mut self, timeline: Arc<Timeline>) -> Self {
        self.timeline = timeline;
        self
    }

    #[must_use]
    pub fn with_loading_period_id(mut self, loading_period_id: PeriodId) -> Self {
        self.loading_period_id = loading_period_id;
        self
    }

    #[must_use]
    pub fn with_buffered_position_us(mut self, buffered_position_us: i64) -> Self {
        self.buffered_position_us = buffered_position_us;
        self
    }

    #[must_use]
    pub fn with_playback_state(mut self, playback_state: PlaybackState) -> Self {
        self.playback_state = playback_state;
        self
    }

    /// Apply a masked lifecycle state; idle and ended players stop loading
    #[must_use]
    pub fn with_masked_playback_state(self, playback_state: PlaybackState) -> Self {
        let snapshot = self.with_playback_state(playback_state);
        if matches!(playback_state, PlaybackState::Idle | PlaybackState::Ended) {
            snapshot.with_is_loading(false)
        } else {
            snapshot
        }
    }

    #[must_use]
    pub fn with_playback_error(mut self, playback_error: Option<PlayerError>) -> Self {
        self.playback_error = playback_error;
        self
    }

    #[must_use]
    pub fn with_is_loading(mut self, is_loading: bool) -> Self {
        self.is_loading = is_loading;
        self
    }

    #[must_use]
    pub fn with_play_when_ready(
        mut self,
        play_when_ready: bool,
        reason: PlayWhenReadyChangeReason,
        suppression_reason: SuppressionReason,
    ) -> Self {
        self.play_when_ready = play_when_ready;
        self.play_when_ready_change_reason = reason;
        self.suppression_reason = suppression_reason;
        self
    }

    #[must_use]
    pub fn with_playback_parameters(mut self, playback_parameters: PlaybackParameters) -> Self {
        self.playback_parameters = playback_parameters;
        self
    }

    #[must_use]
    pub fn with_offload_scheduling_enabled(mut self, enabled: bool) -> Self {
        self.offload_scheduling_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_sleeping_for_offload(mut self, sleeping: bool) -> Self {
        self.sleeping_for_offload = sleeping;
        self
    }

    /// Stop loading ahead: the loading period collapses onto the playing one
    #[must_use]
    pub fn with_loading_stopped(mut self) -> Self {
        self.loading_period_id = self.period_id;
        self.buffered_position_us = self.position_us;
        self.total_buffered_duration_us = 0;
        self
    }

    /// Ready, playing and not suppressed
    pub fn is_playing(&self) -> bool {
        self.playback_state == PlaybackState::Ready
            && self.play_when_ready
            && self.suppression_reason == SuppressionReason::None
    }

    /// Window containing the playing period, if the timeline is non-empty
    pub fn window_index(&self) -> Option<usize> {
        self.timeline.window_index_of_period(&self.period_id.period_uid)
    }

    /// Period position converted to a window position
    pub fn window_position_us(&self, period_position_us: i64) -> i64 {
        self.timeline
            .period_by_uid(&self.period_id.period_uid)
            .map(|p| period_position_us + p.position_in_window_us)
            .unwrap_or(period_position_us)
    }

    /// Requested content position relative to the window
    ///
    /// Falls back to the window default position when no content position was
    /// requested.
    pub fn requested_content_window_position_us(&self) -> i64 {
        let Some(period) = self.timeline.period_by_uid(&self.period_id.period_uid) else {
            return self.requested_content_position_us.unwrap_or(0);
        };
        match self.requested_content_position_us {
            Some(position_us) => period.position_in_window_us + position_us,
            None => self
                .timeline
                .window(period.window_index)
                .map(|w| w.default_position_us)
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_snapshot_is_idle_on_dummy_period() {
        let snapshot = PlaybackSnapshot::initial();
        assert_eq!(snapshot.playback_state, PlaybackState::Idle);
        assert!(snapshot.period_id.period_uid.is_dummy());
        assert!(snapshot.timeline.is_empty());
        assert_eq!(snapshot.window_index(), None);
    }

    #[test]
    fn masked_end_state_stops_loading() {
        let snapshot = PlaybackSnapshot::initial()
            .with_is_loading(true)
            .with_masked_playback_state(PlaybackState::Ended);
        assert!(!snapshot.is_loading);

        let buffering = PlaybackSnapshot::initial()
            .with_is_loading(true)
            .with_masked_playback_state(PlaybackState::Buffering);
        assert!(buffering.is_loading);
    }

    #[test]
    fn is_playing_requires_ready_and_no_suppression() {
        let ready = PlaybackSnapshot::initial()
            .with_playback_state(PlaybackState::Ready)
            .with_play_when_ready(
                true,
                PlayWhenReadyChangeReason::UserRequest,
                SuppressionReason::None,
            );
        assert!(ready.is_playing());

        let suppressed = ready.clone().with_play_when_ready(
            true,
            PlayWhenReadyChangeReason::UserRequest,
            SuppressionReason::TransientAudioFocusLoss,
        );
        assert!(!suppressed.is_playing());
        assert!(!ready.with_playback_state(PlaybackState::Buffering).is_playing());
    }

    #[test]
    fn format_track_type_from_mime() {
        assert_eq!(Format::new("audio/flac").track_type(), Some(TrackType::Audio));
        assert_eq!(Format::new("video/avc").track_type(), Some(TrackType::Video));
        assert_eq!(
            Format::new("application/x-subrip").track_type(),
            Some(TrackType::Text)
        );
        assert_eq!(Format::new("application/octet-stream").track_type(), None);
    }
}
