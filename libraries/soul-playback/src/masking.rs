//! State Masking Engine
//!
//! Predicts the snapshot a command will lead to before the engine confirms
//! it, so getters read back what the caller just asked for.
//!
//! While the timeline is empty there is no period to point at. The requested
//! window and position are kept as masking variables instead and picked up
//! again once items appear.

use crate::snapshot::PlaybackSnapshot;
use soul_timeline::{
    ms_to_us, resolve_subsequent_period, us_to_ms, PeriodId, RepeatMode, Timeline, Uid,
};
use std::sync::Arc;

/// Period UID and period-relative position in microseconds
pub type PeriodPosition = (Uid, i64);

/// Window and position remembered while the timeline is empty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaskingPosition {
    pub window_index: Option<usize>,
    pub window_position_ms: i64,
    pub period_index: usize,
}

/// Masking variables and the masking rules that use them
#[derive(Debug, Clone, Default)]
pub struct StateMasker {
    position: MaskingPosition,
}

impl StateMasker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> MaskingPosition {
        self.position
    }

    /// Forget the remembered position, used when a confirmed timeline empties
    pub fn clear(&mut self) {
        self.position = MaskingPosition::default();
    }

    pub fn current_window_index(&self, snapshot: &PlaybackSnapshot) -> Option<usize> {
        if snapshot.timeline.is_empty() {
            self.position.window_index
        } else {
            snapshot.window_index()
        }
    }

    pub fn current_period_index(&self, snapshot: &PlaybackSnapshot) -> usize {
        if snapshot.timeline.is_empty() {
            self.position.period_index
        } else {
            snapshot
                .timeline
                .index_of_period(&snapshot.period_id.period_uid)
                .unwrap_or(0)
        }
    }

    /// Window-relative position, or the ad position while an ad plays
    pub fn current_position_us(&self, snapshot: &PlaybackSnapshot) -> i64 {
        if snapshot.timeline.is_empty() {
            ms_to_us(self.position.window_position_ms)
        } else if snapshot.period_id.is_ad() {
            snapshot.position_us
        } else {
            snapshot.window_position_us(snapshot.position_us)
        }
    }

    /// Window-relative content position; during an ad, where content resumes
    pub fn content_position_ms(&self, snapshot: &PlaybackSnapshot) -> i64 {
        if snapshot.period_id.is_ad() {
            us_to_ms(snapshot.requested_content_window_position_us())
        } else {
            us_to_ms(self.current_position_us(snapshot))
        }
    }

    /// Resolve a window position, or remember it if the timeline is empty
    ///
    /// A missing or out-of-range window falls back to the first window at its
    /// default position. Returns `None` only for an empty timeline.
    pub fn mask_window_position(
        &mut self,
        timeline: &Timeline,
        window_index: Option<usize>,
        window_position_ms: Option<i64>,
        shuffled: bool,
    ) -> Option<PeriodPosition> {
        if timeline.is_empty() {
            self.position = MaskingPosition {
                window_index,
                window_position_ms: window_position_ms.unwrap_or(0),
                period_index: 0,
            };
            return None;
        }

        let (window_index, window_position_ms) = match window_index {
            Some(index) if index < timeline.window_count() => (index, window_position_ms),
            _ => {
                let first = timeline.first_window_index(shuffled)?;
                let default_ms = timeline.window(first).map(|w| w.default_position_ms());
                (first, default_ms)
            }
        };
        timeline
            .period_position_us(window_index, window_position_ms.map(ms_to_us))
            .ok()
    }

    /// Where playback continues after the timeline changed underneath it
    ///
    /// Keeps the current period if it survived. Otherwise continues at the
    /// default position of the next surviving period in play order, or at
    /// the start of the new timeline.
    pub fn period_position_after_timeline_changed(
        &mut self,
        old: &Timeline,
        new: &Timeline,
        current_window_index: Option<usize>,
        content_position_ms: i64,
        repeat_mode: RepeatMode,
        shuffled: bool,
    ) -> Option<PeriodPosition> {
        if old.is_empty() || new.is_empty() {
            let cleared = !old.is_empty() && new.is_empty();
            return if cleared {
                self.mask_window_position(new, None, None, shuffled)
            } else {
                self.mask_window_position(
                    new,
                    current_window_index,
                    Some(content_position_ms),
                    shuffled,
                )
            };
        }

        let old_position = current_window_index.and_then(|index| {
            old.period_position_us(index, Some(ms_to_us(content_position_ms)))
                .ok()
        });
        let Some((period_uid, period_position_us)) = old_position else {
            return self.mask_window_position(new, None, None, shuffled);
        };
        if new.index_of_period(&period_uid).is_some() {
            return Some((period_uid, period_position_us));
        }

        let next_window = resolve_subsequent_period(&period_uid, old, new, repeat_mode, shuffled)
            .and_then(|uid| new.window_index_of_period(&uid));
        match next_window {
            Some(window_index) => {
                let default_ms = new.window(window_index).map(|w| w.default_position_ms());
                self.mask_window_position(new, Some(window_index), default_ms, shuffled)
            }
            None => self.mask_window_position(new, None, None, shuffled),
        }
    }

    /// Predict the snapshot after moving to `timeline` and `period_position`
    ///
    /// `period_position` must be present unless `timeline` is empty.
    pub fn mask_timeline_and_position(
        &self,
        snapshot: &PlaybackSnapshot,
        timeline: Arc<Timeline>,
        period_position: Option<PeriodPosition>,
    ) -> PlaybackSnapshot {
        let old_timeline = Arc::clone(&snapshot.timeline);
        let old_content_position_ms = self.content_position_ms(snapshot);
        let snapshot = snapshot.clone().with_timeline(Arc::clone(&timeline));

        if timeline.is_empty() {
            let dummy = PeriodId::dummy();
            let position_us = ms_to_us(self.position.window_position_ms);
            return snapshot
                .with_new_position(dummy, position_us, Some(position_us), position_us, 0)
                .without_tracks()
                .with_loading_period_id(dummy)
                .with_buffered_position_us(position_us);
        }
        let Some((new_period_uid, new_content_position_us)) = period_position else {
            tracing::warn!("No period position for a non-empty timeline, keeping position");
            return snapshot;
        };

        let old_period_uid = snapshot.period_id.period_uid;
        let playing_period_changed = old_period_uid != new_period_uid;
        let new_period_id = if playing_period_changed {
            PeriodId::new(new_period_uid)
        } else {
            snapshot.period_id
        };

        let mut old_content_position_us = ms_to_us(old_content_position_ms);
        if let Some(period) = old_timeline.period_by_uid(&old_period_uid) {
            old_content_position_us -= period.position_in_window_us;
        }

        let masked = if playing_period_changed || new_content_position_us < old_content_position_us
        {
            debug_assert!(!new_period_id.is_ad());
            let masked = snapshot.with_new_position(
                new_period_id,
                new_content_position_us,
                Some(new_content_position_us),
                new_content_position_us,
                0,
            );
            let masked = if playing_period_changed {
                masked.without_tracks()
            } else {
                masked
            };
            masked
                .with_loading_period_id(new_period_id)
                .with_buffered_position_us(new_content_position_us)
        } else if new_content_position_us == old_content_position_us {
            let playing_window = timeline.window_index_of_period(&new_period_id.period_uid);
            let loading_window = timeline.window_index_of_period(&snapshot.loading_period_id.period_uid);
            if loading_window.is_none() || loading_window != playing_window {
                let period = timeline.period_by_uid(&new_period_id.period_uid);
                let end_us = match (new_period_id.ad_group_index, new_period_id.ad_index_in_ad_group) {
                    (Some(group), Some(ad)) => period.and_then(|p| p.ad_duration_us(group, ad)),
                    _ => period.and_then(|p| p.duration_us),
                };
                let position_us = snapshot.position_us;
                let buffered_us = end_us.unwrap_or(position_us).max(position_us);
                let discontinuity_us = snapshot.discontinuity_start_position_us;
                snapshot
                    .with_new_position(
                        new_period_id,
                        position_us,
                        Some(position_us),
                        discontinuity_us,
                        buffered_us - position_us,
                    )
                    .with_loading_period_id(new_period_id)
                    .with_buffered_position_us(buffered_us)
            } else {
                snapshot
            }
        } else {
            // Optimistic: the engine's confirmation corrects the buffered
            // figures shortly after.
            debug_assert!(!new_period_id.is_ad());
            let delta_us = new_content_position_us - old_content_position_us;
            let total_buffered_us = (snapshot.total_buffered_duration_us - delta_us).max(0);
            let buffered_us = if snapshot.loading_period_id == snapshot.period_id {
                new_content_position_us + total_buffered_us
            } else {
                snapshot.buffered_position_us
            };
            snapshot
                .with_new_position(
                    new_period_id,
                    new_content_position_us,
                    Some(new_content_position_us),
                    new_content_position_us,
                    total_buffered_us,
                )
                .with_buffered_position_us(buffered_us)
        };

        debug_assert!(
            masked.period_id.is_ad()
                || masked.loading_period_id != masked.period_id
                || (0 <= masked.position_us && masked.position_us <= masked.buffered_position_us),
            "masked position {} outside 0..={}",
            masked.position_us,
            masked.buffered_position_us
        );
        masked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use soul_timeline::{MediaItem, ShuffleOrder};
    use uuid::Uuid;

    const SECOND_US: i64 = 1_000_000;

    fn timeline(holders: &[Uuid]) -> Arc<Timeline> {
        let children = holders
            .iter()
            .enumerate()
            .map(|(i, uid)| {
                let item = MediaItem::new(format!("item{i}"), "file:///music/item.flac");
                (*uid, Arc::new(Timeline::single(item, Some(60 * SECOND_US), true)))
            })
            .collect();
        Arc::new(Timeline::concatenate(children, ShuffleOrder::unshuffled(holders.len())).unwrap())
    }

    /// Playing window `window` at `position_us` with `buffered_us` ahead
    fn playing(timeline: &Arc<Timeline>, window: usize, position_us: i64, ahead_us: i64) -> PlaybackSnapshot {
        let period = PeriodId::with_sequence(timeline.period(window).unwrap().uid, 0);
        PlaybackSnapshot::initial()
            .with_timeline(Arc::clone(timeline))
            .with_new_position(period, position_us, Some(position_us), position_us, ahead_us)
            .with_loading_period_id(period)
            .with_buffered_position_us(position_us + ahead_us)
    }

    #[test]
    fn empty_timeline_uses_dummy_period_and_masking_position() {
        let mut masker = StateMasker::new();
        let empty = Arc::new(Timeline::empty());
        assert_eq!(masker.mask_window_position(&empty, Some(2), Some(1500), false), None);
        assert_eq!(masker.position().window_index, Some(2));

        let old = timeline(&[Uuid::new_v4()]);
        let snapshot = playing(&old, 0, 5 * SECOND_US, SECOND_US);
        let masked = masker.mask_timeline_and_position(&snapshot, empty, None);

        assert!(masked.period_id.period_uid.is_dummy());
        assert_eq!(masked.position_us, 1_500_000);
        assert_eq!(masked.buffered_position_us, 1_500_000);
        assert_eq!(masker.current_window_index(&masked), Some(2));
    }

    #[test]
    fn changed_period_resets_tracks_and_buffer() {
        let masker = StateMasker::new();
        let holders = [Uuid::new_v4(), Uuid::new_v4()];
        let timeline = timeline(&holders);
        let mut snapshot = playing(&timeline, 0, 10 * SECOND_US, 5 * SECOND_US);
        snapshot.static_metadata = vec![Default::default()];

        let target = (timeline.period(1).unwrap().uid, 2 * SECOND_US);
        let masked = masker.mask_timeline_and_position(&snapshot, timeline, Some(target));

        assert_eq!(masked.period_id, PeriodId::new(target.0));
        assert_eq!(masked.position_us, 2 * SECOND_US);
        assert_eq!(masked.buffered_position_us, 2 * SECOND_US);
        assert_eq!(masked.total_buffered_duration_us, 0);
        assert!(masked.static_metadata.is_empty());
    }

    #[test]
    fn backward_seek_in_same_period_resets_buffer_but_keeps_tracks() {
        let masker = StateMasker::new();
        let timeline = timeline(&[Uuid::new_v4()]);
        let mut snapshot = playing(&timeline, 0, 10 * SECOND_US, 5 * SECOND_US);
        snapshot.static_metadata = vec![Default::default()];
        let uid = snapshot.period_id.period_uid;

        let masked = masker.mask_timeline_and_position(&snapshot, timeline, Some((uid, 4 * SECOND_US)));

        assert_eq!(masked.period_id, snapshot.period_id);
        assert_eq!(masked.position_us, 4 * SECOND_US);
        assert_eq!(masked.buffered_position_us, 4 * SECOND_US);
        assert_eq!(masked.static_metadata.len(), 1);
    }

    #[test]
    fn forward_seek_shrinks_buffered_duration() {
        let masker = StateMasker::new();
        let timeline = timeline(&[Uuid::new_v4()]);
        let snapshot = playing(&timeline, 0, 10 * SECOND_US, 5 * SECOND_US);
        let uid = snapshot.period_id.period_uid;

        let masked =
            masker.mask_timeline_and_position(&snapshot, Arc::clone(&timeline), Some((uid, 12 * SECOND_US)));
        assert_eq!(masked.total_buffered_duration_us, 3 * SECOND_US);
        assert_eq!(masked.buffered_position_us, 15 * SECOND_US);

        let beyond = masker.mask_timeline_and_position(&snapshot, timeline, Some((uid, 30 * SECOND_US)));
        assert_eq!(beyond.total_buffered_duration_us, 0);
        assert_eq!(beyond.buffered_position_us, 30 * SECOND_US);
    }

    #[test]
    fn unchanged_position_keeps_buffer_when_loading_in_window() {
        let masker = StateMasker::new();
        let timeline = timeline(&[Uuid::new_v4()]);
        let snapshot = playing(&timeline, 0, 10 * SECOND_US, 5 * SECOND_US);
        let uid = snapshot.period_id.period_uid;

        let masked = masker.mask_timeline_and_position(&snapshot, timeline, Some((uid, 10 * SECOND_US)));
        assert_eq!(masked.buffered_position_us, 15 * SECOND_US);
        assert_eq!(masked.total_buffered_duration_us, 5 * SECOND_US);
    }

    #[test]
    fn unchanged_position_drops_loading_period_outside_window() {
        let masker = StateMasker::new();
        let holders = [Uuid::new_v4(), Uuid::new_v4()];
        let timeline = timeline(&holders);
        let next = PeriodId::with_sequence(timeline.period(1).unwrap().uid, 1);
        let snapshot = playing(&timeline, 0, 10 * SECOND_US, 5 * SECOND_US).with_loading_period_id(next);
        let uid = snapshot.period_id.period_uid;

        let masked = masker.mask_timeline_and_position(&snapshot, timeline, Some((uid, 10 * SECOND_US)));
        assert_eq!(masked.loading_period_id, snapshot.period_id);
        assert_eq!(masked.buffered_position_us, 60 * SECOND_US);
        assert_eq!(masked.total_buffered_duration_us, 50 * SECOND_US);
    }

    #[test]
    fn removed_period_continues_at_subsequent_window() {
        let mut masker = StateMasker::new();
        let holders = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let old = timeline(&holders);
        let new = timeline(&[holders[0], holders[2]]);

        let position = masker
            .period_position_after_timeline_changed(&old, &new, Some(1), 7_000, RepeatMode::Off, false)
            .unwrap();
        assert_eq!(position, (new.period(1).unwrap().uid, 0));
    }

    #[test]
    fn surviving_period_keeps_position() {
        let mut masker = StateMasker::new();
        let holders = [Uuid::new_v4(), Uuid::new_v4()];
        let old = timeline(&holders);
        let new = timeline(&[holders[1], holders[0]]);

        let position = masker
            .period_position_after_timeline_changed(&old, &new, Some(0), 7_000, RepeatMode::Off, false)
            .unwrap();
        assert_eq!(position, (old.period(0).unwrap().uid, 7 * SECOND_US));
    }

    #[test]
    fn clearing_timeline_forgets_window() {
        let mut masker = StateMasker::new();
        let old = timeline(&[Uuid::new_v4()]);
        let position = masker.period_position_after_timeline_changed(
            &old,
            &Timeline::empty(),
            Some(0),
            7_000,
            RepeatMode::Off,
            false,
        );
        assert_eq!(position, None);
        assert_eq!(masker.position(), MaskingPosition::default());
    }
}
