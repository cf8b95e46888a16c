//! Property-based tests for the ledger, playlist identities and masking
//!
//! Random command sequences must never break read-your-writes, and edits to
//! the playlist must never reassign the identity of a surviving item.

mod common;

use common::*;
use proptest::prelude::*;
use soul_playback::{MediaItem, OperationLedger, PlaylistModel, RepeatMode, Timeline};
use std::collections::HashMap;

// ===== Helpers =====

#[derive(Debug, Clone)]
enum Edit {
    Insert { index: usize, count: usize },
    Remove { from: usize, len: usize },
    Move { from: usize, len: usize, new_from: usize },
}

fn edit_strategy() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..10, 1usize..4).prop_map(|(index, count)| Edit::Insert { index, count }),
        (0usize..10, 0usize..4).prop_map(|(from, len)| Edit::Remove { from, len }),
        (0usize..10, 1usize..4, 0usize..10)
            .prop_map(|(from, len, new_from)| Edit::Move { from, len, new_from }),
    ]
}

fn window_uids(timeline: &Timeline) -> HashMap<String, soul_timeline::Uid> {
    timeline
        .windows()
        .iter()
        .map(|w| (w.media_item.media_id.clone(), w.uid))
        .collect()
}

#[derive(Debug, Clone)]
enum Action {
    Seek { window: usize, position_ms: i64 },
    Repeat(RepeatMode),
    Shuffle(bool),
    Volume(f32),
    PlayWhenReady(bool),
    Speed(f32),
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0usize..4, 0i64..60_000)
            .prop_map(|(window, position_ms)| Action::Seek { window, position_ms }),
        prop_oneof![
            Just(RepeatMode::Off),
            Just(RepeatMode::One),
            Just(RepeatMode::All)
        ]
        .prop_map(Action::Repeat),
        any::<bool>().prop_map(Action::Shuffle),
        (0.0f32..1.0).prop_map(Action::Volume),
        any::<bool>().prop_map(Action::PlayWhenReady),
        (0.25f32..4.0).prop_map(Action::Speed),
    ]
}

// ===== Ledger =====

proptest! {
    #[test]
    fn ledger_settles_exactly_when_drained(
        steps in prop::collection::vec(prop_oneof![Just(None), (0usize..3).prop_map(Some)], 0..50)
    ) {
        let mut ledger = OperationLedger::new();
        let mut expected = 0usize;

        for step in steps {
            match step {
                None => {
                    ledger.record();
                    expected += 1;
                }
                Some(acks) => {
                    expected = expected.saturating_sub(acks);
                    let settlement = ledger.acknowledge(acks, None, None);
                    prop_assert_eq!(settlement.is_some(), expected == 0);
                }
            }
            prop_assert_eq!(ledger.pending(), expected);
            prop_assert_eq!(ledger.is_settled(), expected == 0);
        }
    }
}

// ===== Playlist identity =====

proptest! {
    #[test]
    fn surviving_items_keep_their_identity(
        initial in 1usize..6,
        edits in prop::collection::vec(edit_strategy(), 1..20),
        seed in any::<u64>(),
    ) {
        let mut next_id = 0usize;
        let mut fresh = |count: usize| -> Vec<MediaItem> {
            (0..count)
                .map(|_| {
                    next_id += 1;
                    item(&format!("item-{next_id}"))
                })
                .collect()
        };

        let mut playlist = PlaylistModel::new(seed);
        let mut uids = window_uids(&playlist.set_all(fresh(initial)).unwrap());

        for edit in edits {
            let len = playlist.len();
            let timeline = match edit {
                Edit::Insert { index, count } => playlist.insert(index, fresh(count)).unwrap(),
                Edit::Remove { from, len: span } => {
                    let from = from.min(len);
                    let to = (from + span).min(len);
                    playlist.remove(from, to).unwrap()
                }
                Edit::Move { from, len: span, new_from } => {
                    if len == 0 {
                        continue;
                    }
                    let from = from % len;
                    let to = (from + span).min(len);
                    playlist.move_range(from, to, new_from).unwrap()
                }
            };

            prop_assert_eq!(timeline.window_count(), playlist.len());
            prop_assert_eq!(playlist.shuffle_order().len(), playlist.len());

            let after = window_uids(&timeline);
            for (media_id, uid) in &after {
                if let Some(before) = uids.get(media_id) {
                    prop_assert_eq!(before, uid, "{} changed identity", media_id);
                }
            }
            uids = after;
        }
    }
}

// ===== Read-your-writes =====

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn getters_reflect_commands_before_confirmation(
        actions in prop::collection::vec(action_strategy(), 1..25)
    ) {
        let mut h = harness();
        h.player.set_media_items(items(&["a", "b", "c", "d"]), true).unwrap();
        h.player.prepare().unwrap();

        for action in actions {
            match action {
                Action::Seek { window, position_ms } => {
                    h.player.seek_to(window, Some(position_ms)).unwrap();
                    prop_assert_eq!(h.player.get_current_media_item_index(), window);
                    prop_assert_eq!(h.player.get_current_position_ms(), position_ms);
                }
                Action::Repeat(mode) => {
                    h.player.set_repeat_mode(mode).unwrap();
                    prop_assert_eq!(h.player.get_repeat_mode(), mode);
                }
                Action::Shuffle(enabled) => {
                    h.player.set_shuffle_mode_enabled(enabled).unwrap();
                    prop_assert_eq!(h.player.get_shuffle_mode_enabled(), enabled);
                }
                Action::Volume(volume) => {
                    h.player.set_volume(volume).unwrap();
                    prop_assert_eq!(h.player.get_volume(), volume);
                }
                Action::PlayWhenReady(play_when_ready) => {
                    h.player.set_play_when_ready(play_when_ready).unwrap();
                    prop_assert_eq!(h.player.get_play_when_ready(), play_when_ready);
                }
                Action::Speed(speed) => {
                    h.player.set_playback_speed(speed).unwrap();
                    prop_assert_eq!(h.player.get_playback_parameters().speed, speed);
                }
            }
        }

        // Nothing was confirmed, so every command is still in flight
        let pending = h.player.pending_operation_count();
        prop_assert!(pending >= 2);
        h.engine.confirm(h.player.snapshot().clone(), pending);
        let expected_index = h.player.get_current_media_item_index();
        h.player.process_pending_updates().unwrap();
        prop_assert_eq!(h.player.pending_operation_count(), 0);
        prop_assert_eq!(h.player.get_current_media_item_index(), expected_index);
    }
}
