//! Engine confirmations, player errors and renderer messaging

mod common;

use common::*;
use soul_playback::{
    DiscontinuityReason, EngineCommand, Format, FormatSupport, MediaItemTransitionReason,
    MessagePayload, PeriodId, PlaybackConfig, PlaybackError, PlaybackInfoUpdate, PlaybackState,
    PlayerError, PlayerErrorCode, PlayerEvent, RepeatMode, Renderer, TimeoutOperation, TrackGroup,
    TrackType, Tracks, VideoOutput,
};
use std::sync::Arc;

fn prepared(ids: &[&str]) -> Harness {
    let mut h = harness();
    h.player.set_media_items(items(ids), true).unwrap();
    h.player.prepare().unwrap();
    let confirmed = playing_at(h.player.snapshot(), 0, 0, PlaybackState::Ready);
    h.engine.confirm(confirmed, 2);
    h.player.process_pending_updates().unwrap();
    h.events.clear();
    h.engine.clear();
    h
}

// ============================================================================
// CONFIRMATIONS
// ============================================================================

#[test]
fn automatic_transition_reports_next_item() {
    let mut h = prepared(&["a", "b"]);

    let next = playing_at(h.player.snapshot(), 1, 0, PlaybackState::Ready);
    h.engine
        .post(PlaybackInfoUpdate::new(next).with_discontinuity(DiscontinuityReason::AutoTransition));
    h.player.process_pending_updates().unwrap();

    assert_eq!(h.player.get_current_media_item_index(), 1);
    let batch = h.events.last_batch();
    assert!(batch.iter().any(|e| matches!(
        e,
        PlayerEvent::PositionDiscontinuity { reason: DiscontinuityReason::AutoTransition, .. }
    )));
    let transition = batch.iter().find_map(|e| match e {
        PlayerEvent::MediaItemTransition { media_item, reason } => {
            Some((media_item.as_ref().map(|m| m.media_id.clone()), *reason))
        }
        _ => None,
    });
    assert_eq!(
        transition,
        Some((Some("b".to_string()), MediaItemTransitionReason::Auto))
    );
}

#[test]
fn repeating_an_item_is_a_repeat_transition() {
    let mut h = prepared(&["a"]);
    let current = h.player.snapshot().period_id;

    let mut again = h.player.snapshot().clone();
    again.period_id = PeriodId::with_sequence(current.period_uid, 7);
    h.engine
        .post(PlaybackInfoUpdate::new(again).with_discontinuity(DiscontinuityReason::AutoTransition));
    h.player.process_pending_updates().unwrap();

    assert!(h.events.last_batch().iter().any(|e| matches!(
        e,
        PlayerEvent::MediaItemTransition { reason: MediaItemTransitionReason::Repeat, .. }
    )));
}

#[test]
fn progress_without_discontinuity_is_silent_about_position() {
    let mut h = prepared(&["a"]);

    let later = playing_at(h.player.snapshot(), 0, 0, PlaybackState::Ready);
    let mut later = later;
    later.position_us = 3_000_000;
    h.engine.post(PlaybackInfoUpdate::new(later));
    h.player.process_pending_updates().unwrap();

    assert_eq!(h.player.get_current_position_ms(), 3_000);
    assert!(h.events.batches().is_empty());
}

#[test]
fn engine_error_surfaces_and_retry_clears_it() {
    let mut h = prepared(&["a"]);

    let failed = h
        .player
        .snapshot()
        .clone()
        .with_playback_state(PlaybackState::Idle)
        .with_playback_error(Some(PlayerError::new(PlayerErrorCode::Source, "404")));
    h.engine.post(PlaybackInfoUpdate::new(failed));
    h.player.process_pending_updates().unwrap();

    assert_eq!(h.player.get_player_error().unwrap().code, PlayerErrorCode::Source);
    let batch = h.events.last_batch();
    assert!(matches!(batch[0], PlayerEvent::PlayerErrorChanged { error: Some(_) }));
    assert!(matches!(batch[1], PlayerEvent::PlayerError { .. }));

    h.player.retry().unwrap();
    assert!(h.player.get_player_error().is_none());
    assert_eq!(h.player.get_playback_state(), PlaybackState::Buffering);
    assert_eq!(h.engine.command_names(), vec!["Prepare"]);
}

#[test]
fn confirmed_tracks_are_annotated_with_renderer_support() {
    let audio = RecordingRenderer::new(TrackType::Audio, vec!["audio/flac"]);
    let mut h = harness_with(PlaybackConfig::default(), vec![audio as Arc<dyn Renderer>]);
    h.player.set_media_items(items(&["a"]), true).unwrap();

    let mut confirmed = playing_at(h.player.snapshot(), 0, 0, PlaybackState::Idle);
    confirmed.tracks = Tracks::new(vec![
        TrackGroup::new(
            TrackType::Audio,
            vec![Format::new("audio/flac"), Format::new("audio/opus")],
        )
        .select(0),
        TrackGroup::new(TrackType::Video, vec![Format::new("video/avc")]),
    ]);
    h.engine.confirm(confirmed, 1);
    h.player.process_pending_updates().unwrap();

    let tracks = h.player.get_current_tracks();
    assert_eq!(
        tracks.groups[0].support,
        vec![FormatSupport::Handled, FormatSupport::UnsupportedSubtype]
    );
    assert_eq!(tracks.groups[1].support, vec![FormatSupport::UnsupportedType]);
    assert!(tracks.is_type_selected(TrackType::Audio));
}

#[test]
fn seek_during_ad_is_acknowledged_but_ignored() {
    let mut h = prepared(&["a", "b"]);
    let mut in_ad = h.player.snapshot().clone();
    in_ad.period_id = PeriodId::ad(in_ad.period_id.period_uid, 0, 0, 0);
    h.engine.post(PlaybackInfoUpdate::new(in_ad));
    h.player.process_pending_updates().unwrap();
    assert!(h.player.is_playing_ad());
    h.events.clear();

    h.player.seek_to(1, None).unwrap();
    assert_eq!(h.player.pending_operation_count(), 1);
    assert_eq!(h.player.get_current_media_item_index(), 0);

    h.player.process_pending_updates().unwrap();
    assert_eq!(h.player.pending_operation_count(), 0);
    assert!(h.engine.command_names().is_empty());
    assert!(h.events.batches().is_empty());
}

// ============================================================================
// TIMEOUTS
// ============================================================================

#[test]
fn stalled_output_detach_stops_with_timeout_error() {
    let video = RecordingRenderer::new(TrackType::Video, vec!["video/avc"]);
    let config = PlaybackConfig {
        detach_output_timeout_ms: 20,
        ..Default::default()
    };
    let mut h = harness_with(config, vec![video as Arc<dyn Renderer>]);
    h.player.set_media_items(items(&["a"]), true).unwrap();
    h.player.prepare().unwrap();

    h.player
        .set_video_output(Some(VideoOutput::new(1, "main")))
        .unwrap();
    assert_eq!(h.player.get_playback_state(), PlaybackState::Buffering);

    h.engine.stall_messages();
    h.events.clear();
    h.player
        .set_video_output(Some(VideoOutput::new(2, "pip")))
        .unwrap();

    assert_eq!(h.player.get_playback_state(), PlaybackState::Idle);
    assert_eq!(h.player.get_video_output(), Some(&VideoOutput::new(2, "pip")));
    let error = h.player.get_player_error().unwrap();
    assert_eq!(
        error.code,
        PlayerErrorCode::Timeout(TimeoutOperation::DetachOutput)
    );
    assert!(h
        .events
        .events()
        .iter()
        .any(|e| matches!(e, PlayerEvent::PlayerError { error } if error.is_timeout())));
}

#[test]
fn first_output_attach_does_not_wait() {
    let video = RecordingRenderer::new(TrackType::Video, vec![]);
    let mut h = harness_with(PlaybackConfig::default(), vec![video as Arc<dyn Renderer>]);
    h.engine.stall_messages();

    h.player
        .set_video_output(Some(VideoOutput::new(1, "main")))
        .unwrap();

    assert!(h.player.get_player_error().is_none());
    assert_eq!(h.engine.command_names(), vec!["SendMessage"]);
}

#[test]
fn foreground_mode_timeout_becomes_player_error() {
    let mut h = prepared(&["a"]);
    h.engine.fail_foreground_mode();

    h.player.set_foreground_mode(true).unwrap();

    assert_eq!(h.player.get_playback_state(), PlaybackState::Idle);
    assert_eq!(
        h.player.get_player_error().unwrap().code,
        PlayerErrorCode::Timeout(TimeoutOperation::SetForegroundMode)
    );
    assert_eq!(h.engine.command_names(), vec!["Stop"]);
}

#[test]
fn release_timeout_is_reported_before_listeners_go() {
    let mut h = prepared(&["a"]);
    h.engine.fail_release();

    h.player.release().unwrap();

    let events = h.events.events();
    assert!(events.iter().any(|e| matches!(
        e,
        PlayerEvent::PlayerError { error }
            if error.code == PlayerErrorCode::Timeout(TimeoutOperation::Release)
    )));
    assert!(h.player.is_released());
    assert_eq!(h.player.get_playback_state(), PlaybackState::Idle);
    assert!(h.player.prepare().is_err());
}

// ============================================================================
// DISCONNECTED ENGINE
// ============================================================================

#[test]
fn rejected_playlist_edits_leave_player_untouched() {
    let mut h = prepared(&["a", "b"]);
    let before = h.player.snapshot().clone();
    h.engine.disconnect();

    assert!(matches!(
        h.player.add_media_items(items(&["c"])),
        Err(PlaybackError::EngineDisconnected)
    ));
    assert!(matches!(
        h.player.move_media_items(0, 1, 1),
        Err(PlaybackError::EngineDisconnected)
    ));
    assert!(matches!(
        h.player.set_media_items(items(&["x"]), true),
        Err(PlaybackError::EngineDisconnected)
    ));
    assert!(matches!(
        h.player.stop_and_reset(),
        Err(PlaybackError::EngineDisconnected)
    ));

    assert_eq!(h.player.get_media_item_count(), 2);
    assert_eq!(h.player.snapshot(), &before);
    assert_eq!(h.player.pending_operation_count(), 0);
    assert!(h.events.events().is_empty());
    // The playlist model still agrees with the timeline
    assert!(matches!(
        h.player.remove_media_items(2, 3),
        Err(PlaybackError::InvalidRange { from: 2, to: 3, len: 2 })
    ));
}

#[test]
fn rejected_controls_are_not_counted_or_applied() {
    let mut h = prepared(&["a", "b"]);
    h.engine.disconnect();

    assert!(h.player.seek_to(1, Some(500)).is_err());
    assert!(h.player.pause().is_ok());
    assert!(h.player.play().is_err());
    assert!(h.player.set_repeat_mode(RepeatMode::All).is_err());
    assert!(h.player.set_shuffle_mode_enabled(true).is_err());

    assert_eq!(h.player.get_current_media_item_index(), 0);
    assert_eq!(h.player.get_current_position_ms(), 0);
    assert_eq!(h.player.get_repeat_mode(), RepeatMode::Off);
    assert!(!h.player.get_shuffle_mode_enabled());
    assert_eq!(h.player.pending_operation_count(), 0);
    assert!(h.events.events().is_empty());
    assert!(h.engine.command_names().is_empty());
}

// ============================================================================
// RENDERER MESSAGES
// ============================================================================

#[test]
fn volume_goes_to_audio_renderers_only() {
    let audio = RecordingRenderer::new(TrackType::Audio, vec![]);
    let video = RecordingRenderer::new(TrackType::Video, vec![]);
    let mut h = harness_with(
        PlaybackConfig::default(),
        vec![audio as Arc<dyn Renderer>, video as Arc<dyn Renderer>],
    );

    h.player.set_volume(0.25).unwrap();

    let commands = h.engine.take_commands();
    match commands.as_slice() {
        [EngineCommand::SendMessage(message)] => {
            assert_eq!(message.target, 0);
            assert_eq!(message.payload, MessagePayload::Volume(0.25));
        }
        other => panic!("unexpected commands: {other:?}"),
    }
    assert_eq!(h.player.get_volume(), 0.25);
    assert_eq!(
        h.events.last_batch(),
        vec![PlayerEvent::VolumeChanged { volume: 0.25 }]
    );
    assert_eq!(h.player.pending_operation_count(), 0);
}

#[test]
fn audio_session_id_reaches_audio_and_video_renderers() {
    let audio = RecordingRenderer::new(TrackType::Audio, vec![]);
    let video = RecordingRenderer::new(TrackType::Video, vec![]);
    let mut h = harness_with(
        PlaybackConfig::default(),
        vec![audio as Arc<dyn Renderer>, video as Arc<dyn Renderer>],
    );

    h.player.set_audio_session_id(42).unwrap();

    let targets: Vec<_> = h
        .engine
        .take_commands()
        .iter()
        .filter_map(|c| match c {
            EngineCommand::SendMessage(m) => Some(m.target),
            _ => None,
        })
        .collect();
    assert_eq!(targets, vec![0, 1]);
    assert_eq!(h.player.get_audio_session_id(), 42);
}
