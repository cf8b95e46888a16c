//! Discontinuity and media item transition classification

use crate::snapshot::PlaybackSnapshot;
use crate::types::{DiscontinuityReason, MediaItemTransitionReason, PositionInfo};
use soul_timeline::us_to_ms;

/// Whether the active media item changed between two snapshots, and why
pub fn classify_media_item_transition(
    old: &PlaybackSnapshot,
    new: &PlaybackSnapshot,
    discontinuity: Option<DiscontinuityReason>,
    timeline_changed: bool,
) -> Option<MediaItemTransitionReason> {
    match (old.timeline.is_empty(), new.timeline.is_empty()) {
        (true, true) => return None,
        (true, false) | (false, true) => return Some(MediaItemTransitionReason::PlaylistChanged),
        (false, false) => {}
    }

    let old_window_uid = old
        .window_index()
        .and_then(|i| old.timeline.window(i))
        .map(|w| w.uid);
    let new_window_uid = new
        .window_index()
        .and_then(|i| new.timeline.window(i))
        .map(|w| w.uid);

    if old_window_uid != new_window_uid {
        debug_assert!(
            discontinuity.is_some() || timeline_changed,
            "media item changed without a discontinuity or timeline change"
        );
        return match discontinuity {
            Some(DiscontinuityReason::AutoTransition) => Some(MediaItemTransitionReason::Auto),
            Some(DiscontinuityReason::Seek) => Some(MediaItemTransitionReason::Seek),
            _ if timeline_changed => Some(MediaItemTransitionReason::PlaylistChanged),
            _ => {
                tracing::warn!("Media item changed without a discontinuity or timeline change");
                Some(MediaItemTransitionReason::PlaylistChanged)
            }
        };
    }

    let repeated = discontinuity == Some(DiscontinuityReason::AutoTransition)
        && old.period_id.window_sequence_number < new.period_id.window_sequence_number;
    repeated.then_some(MediaItemTransitionReason::Repeat)
}

/// Position the player left, as reported with a discontinuity
///
/// `new` is only consulted for an automatic transition out of content
/// clipped at an ad cue point, where the exact cue point is the new
/// requested content position. `masked_window_index` is used when the old
/// timeline was empty.
pub fn previous_position_info(
    reason: DiscontinuityReason,
    old: &PlaybackSnapshot,
    new: &PlaybackSnapshot,
    masked_window_index: usize,
) -> PositionInfo {
    let old_period = old.timeline.period_by_uid(&old.period_id.period_uid);
    let old_window = old_period.and_then(|p| old.timeline.window(p.window_index));
    let period_offset_us = old_period.map_or(0, |p| p.position_in_window_us);
    let ad = old
        .period_id
        .ad_group_index
        .zip(old.period_id.ad_index_in_ad_group);

    let (position_us, content_position_us) = match (reason, ad) {
        (DiscontinuityReason::AutoTransition, Some((group, index))) => (
            old_period
                .and_then(|p| p.ad_duration_us(group, index))
                .unwrap_or(old.position_us),
            old.requested_content_window_position_us(),
        ),
        (DiscontinuityReason::AutoTransition, None)
            if old.period_id.next_ad_group_index.is_some() =>
        {
            let cue_us = new.requested_content_window_position_us();
            (cue_us, cue_us)
        }
        (DiscontinuityReason::AutoTransition, None) => {
            let end_us = period_offset_us
                + old_period
                    .and_then(|p| p.duration_us)
                    .unwrap_or(old.position_us);
            (end_us, end_us)
        }
        (_, Some(_)) => (old.position_us, old.requested_content_window_position_us()),
        (_, None) => {
            let position_us = period_offset_us + old.position_us;
            (position_us, position_us)
        }
    };

    PositionInfo {
        window_uid: old_window.map(|w| w.uid),
        media_item_index: old_period.map_or(masked_window_index, |p| p.window_index),
        media_item: old_window.map(|w| w.media_item.clone()),
        period_uid: old_period.map(|p| p.uid),
        period_index: old.timeline.index_of_period(&old.period_id.period_uid),
        position_ms: us_to_ms(position_us),
        content_position_ms: us_to_ms(content_position_us),
        ad_group_index: old.period_id.ad_group_index,
        ad_index_in_ad_group: old.period_id.ad_index_in_ad_group,
    }
}

/// Position the player moved to, given the window-relative start position
pub fn current_position_info(
    snapshot: &PlaybackSnapshot,
    media_item_index: usize,
    window_start_position_us: i64,
) -> PositionInfo {
    let period = snapshot.timeline.period_by_uid(&snapshot.period_id.period_uid);
    let window = period.and_then(|p| snapshot.timeline.window(p.window_index));
    let position_ms = us_to_ms(window_start_position_us);
    let content_position_ms = if snapshot.period_id.is_ad() {
        us_to_ms(snapshot.requested_content_window_position_us())
    } else {
        position_ms
    };

    PositionInfo {
        window_uid: window.map(|w| w.uid),
        media_item_index,
        media_item: window.map(|w| w.media_item.clone()),
        period_uid: period.map(|p| p.uid),
        period_index: snapshot
            .timeline
            .index_of_period(&snapshot.period_id.period_uid),
        position_ms,
        content_position_ms,
        ad_group_index: snapshot.period_id.ad_group_index,
        ad_index_in_ad_group: snapshot.period_id.ad_index_in_ad_group,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_timeline::{
        AdGroup, MediaItem, Period, PeriodId, ShuffleOrder, Timeline, Uid, Window,
    };
    use std::sync::Arc;
    use uuid::Uuid;

    fn timeline(holders: &[Uuid]) -> Arc<Timeline> {
        let children = holders
            .iter()
            .map(|uid| {
                let item = MediaItem::new(uid.to_string(), "file:///music/item.flac");
                (*uid, Arc::new(Timeline::single(item, Some(30_000_000), true)))
            })
            .collect();
        Arc::new(Timeline::concatenate(children, ShuffleOrder::unshuffled(holders.len())).unwrap())
    }

    fn at(timeline: &Arc<Timeline>, window: usize, sequence: u64, position_us: i64) -> PlaybackSnapshot {
        let uid = timeline.period(window).unwrap().uid;
        PlaybackSnapshot::initial()
            .with_timeline(Arc::clone(timeline))
            .with_new_position(PeriodId::with_sequence(uid, sequence), position_us, None, 0, 0)
    }

    #[test]
    fn empty_timelines_never_transition() {
        let empty = PlaybackSnapshot::initial();
        assert_eq!(
            classify_media_item_transition(&empty, &empty, None, false),
            None
        );
    }

    #[test]
    fn appearing_timeline_is_playlist_change() {
        let empty = PlaybackSnapshot::initial();
        let timeline = timeline(&[Uuid::new_v4()]);
        let filled = at(&timeline, 0, 0, 0);
        assert_eq!(
            classify_media_item_transition(&empty, &filled, None, true),
            Some(MediaItemTransitionReason::PlaylistChanged)
        );
        assert_eq!(
            classify_media_item_transition(&filled, &empty, None, true),
            Some(MediaItemTransitionReason::PlaylistChanged)
        );
    }

    #[test]
    fn window_change_reason_follows_discontinuity() {
        let timeline = timeline(&[Uuid::new_v4(), Uuid::new_v4()]);
        let first = at(&timeline, 0, 0, 0);
        let second = at(&timeline, 1, 1, 0);

        assert_eq!(
            classify_media_item_transition(
                &first,
                &second,
                Some(DiscontinuityReason::AutoTransition),
                false
            ),
            Some(MediaItemTransitionReason::Auto)
        );
        assert_eq!(
            classify_media_item_transition(&first, &second, Some(DiscontinuityReason::Seek), false),
            Some(MediaItemTransitionReason::Seek)
        );
        assert_eq!(
            classify_media_item_transition(&first, &second, Some(DiscontinuityReason::Remove), true),
            Some(MediaItemTransitionReason::PlaylistChanged)
        );
    }

    #[test]
    fn same_window_with_higher_sequence_is_repeat() {
        let timeline = timeline(&[Uuid::new_v4()]);
        let first_visit = at(&timeline, 0, 0, 29_000_000);
        let second_visit = at(&timeline, 0, 1, 0);

        assert_eq!(
            classify_media_item_transition(
                &first_visit,
                &second_visit,
                Some(DiscontinuityReason::AutoTransition),
                false
            ),
            Some(MediaItemTransitionReason::Repeat)
        );
        assert_eq!(
            classify_media_item_transition(&first_visit, &second_visit, Some(DiscontinuityReason::Seek), false),
            None
        );
    }

    #[test]
    #[cfg_attr(
        debug_assertions,
        should_panic(expected = "media item changed without a discontinuity or timeline change")
    )]
    fn unexplained_window_change_falls_back_to_playlist_change() {
        let timeline = timeline(&[Uuid::new_v4(), Uuid::new_v4()]);
        assert_eq!(
            classify_media_item_transition(&at(&timeline, 0, 0, 0), &at(&timeline, 1, 0, 0), None, false),
            Some(MediaItemTransitionReason::PlaylistChanged)
        );
    }

    #[test]
    fn auto_transition_reports_period_end() {
        let timeline = timeline(&[Uuid::new_v4(), Uuid::new_v4()]);
        let old = at(&timeline, 0, 0, 29_900_000);
        let new = at(&timeline, 1, 1, 0);

        let info = previous_position_info(DiscontinuityReason::AutoTransition, &old, &new, 0);
        assert_eq!(info.position_ms, 30_000);
        assert_eq!(info.media_item_index, 0);
        assert_eq!(info.period_index, Some(0));

        let seek = previous_position_info(DiscontinuityReason::Seek, &old, &new, 0);
        assert_eq!(seek.position_ms, 29_900);
    }

    #[test]
    fn auto_transition_out_of_ad_reports_ad_duration() {
        let window = Window::new(Uid::local(0), MediaItem::new("ad", "file:///ad")).with_duration_us(60_000_000);
        let period = Period::new(Uid::local(0))
            .with_duration_us(60_000_000)
            .with_ad_groups(vec![AdGroup::new(Some(0), vec![Some(5_000_000)])]);
        let timeline = Arc::new(Timeline::from_windows(vec![(window, vec![period])]).unwrap());

        let old = PlaybackSnapshot::initial()
            .with_timeline(Arc::clone(&timeline))
            .with_new_position(PeriodId::ad(Uid::local(0), 0, 0, 0), 4_990_000, Some(0), 0, 0);
        let new = PlaybackSnapshot::initial()
            .with_timeline(timeline)
            .with_new_position(PeriodId::with_sequence(Uid::local(0), 0), 0, Some(0), 0, 0);

        let info = previous_position_info(DiscontinuityReason::AutoTransition, &old, &new, 0);
        assert_eq!(info.position_ms, 5_000);
        assert_eq!(info.content_position_ms, 0);
        assert_eq!(info.ad_group_index, Some(0));
    }

    #[test]
    fn clipped_content_reports_cue_point() {
        let window = Window::new(Uid::local(0), MediaItem::new("c", "file:///c")).with_duration_us(60_000_000);
        let period = Period::new(Uid::local(0))
            .with_duration_us(60_000_000)
            .with_ad_groups(vec![AdGroup::new(Some(20_000_000), vec![Some(5_000_000)])]);
        let timeline = Arc::new(Timeline::from_windows(vec![(window, vec![period])]).unwrap());

        let old = PlaybackSnapshot::initial()
            .with_timeline(Arc::clone(&timeline))
            .with_new_position(
                PeriodId::with_sequence(Uid::local(0), 0).with_next_ad_group(0),
                19_990_000,
                Some(0),
                0,
                0,
            );
        let new = PlaybackSnapshot::initial()
            .with_timeline(timeline)
            .with_new_position(PeriodId::ad(Uid::local(0), 0, 0, 0), 0, Some(20_000_000), 0, 0);

        let info = previous_position_info(DiscontinuityReason::AutoTransition, &old, &new, 0);
        assert_eq!(info.position_ms, 20_000);
        assert_eq!(info.content_position_ms, 20_000);
    }

    #[test]
    fn empty_old_timeline_uses_masked_index() {
        let old = PlaybackSnapshot::initial();
        let info = previous_position_info(DiscontinuityReason::Remove, &old, &old, 3);
        assert_eq!(info.media_item_index, 3);
        assert_eq!(info.window_uid, None);
        assert_eq!(info.period_index, None);
    }
}
