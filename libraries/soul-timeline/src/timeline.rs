//! Windows, periods and the playlist timeline
//!
//! A [`Timeline`] is a read-only composition of windows (playable units, one
//! per media item) each owning one or more periods (contiguous seekable
//! segments such as a pre-roll ad and the content). Every window and period is
//! addressed by a stable [`Uid`]; indices are only meaningful for the timeline
//! they were read from.
//!
//! The playlist builds its timeline with [`Timeline::concatenate`], which keeps
//! each holder's child timeline and the shuffle order over holders so traversal
//! (`next_window_index` and friends) honours repeat and shuffle settings.

use crate::error::{Result, TimelineError};
use crate::shuffle::ShuffleOrder;
use crate::types::{MediaItem, RepeatMode};
use crate::uid::Uid;
use std::sync::Arc;
use uuid::Uuid;

/// A group of ads played at one cue point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdGroup {
    /// Cue point in the period, `None` for a post-roll at the end of the source
    pub time_us: Option<i64>,

    /// Duration of each ad in the group, if known
    pub ad_durations_us: Vec<Option<i64>>,
}

impl AdGroup {
    pub fn new(time_us: Option<i64>, ad_durations_us: Vec<Option<i64>>) -> Self {
        Self {
            time_us,
            ad_durations_us,
        }
    }
}

/// Contiguous seekable segment of a window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Period {
    pub uid: Uid,
    pub window_index: usize,
    pub duration_us: Option<i64>,
    pub position_in_window_us: i64,
    pub ad_groups: Vec<AdGroup>,
}

impl Period {
    pub fn new(uid: Uid) -> Self {
        Self {
            uid,
            window_index: 0,
            duration_us: None,
            position_in_window_us: 0,
            ad_groups: Vec::new(),
        }
    }

    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    pub fn with_ad_groups(mut self, ad_groups: Vec<AdGroup>) -> Self {
        self.ad_groups = ad_groups;
        self
    }

    /// Duration of one ad, if the group and ad exist and the duration is known
    pub fn ad_duration_us(&self, ad_group_index: usize, ad_index: usize) -> Option<i64> {
        self.ad_groups
            .get(ad_group_index)?
            .ad_durations_us
            .get(ad_index)
            .copied()
            .flatten()
    }

    /// Cue point of an ad group resolved against this period
    ///
    /// A post-roll resolves to the period duration.
    pub fn ad_group_time_us(&self, ad_group_index: usize) -> Option<i64> {
        let group = self.ad_groups.get(ad_group_index)?;
        group.time_us.or(self.duration_us)
    }
}

/// Playable unit of a timeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub uid: Uid,
    pub media_item: MediaItem,
    pub default_position_us: i64,
    pub duration_us: Option<i64>,
    pub position_in_first_period_us: i64,
    pub is_seekable: bool,
    pub is_dynamic: bool,
    pub is_live: bool,
    /// Stand-in published before the source reported its real structure
    pub is_placeholder: bool,
    pub first_period_index: usize,
    pub last_period_index: usize,
}

impl Window {
    pub fn new(uid: Uid, media_item: MediaItem) -> Self {
        Self {
            uid,
            media_item,
            default_position_us: 0,
            duration_us: None,
            position_in_first_period_us: 0,
            is_seekable: true,
            is_dynamic: false,
            is_live: false,
            is_placeholder: false,
            first_period_index: 0,
            last_period_index: 0,
        }
    }

    pub fn with_duration_us(mut self, duration_us: i64) -> Self {
        self.duration_us = Some(duration_us);
        self
    }

    pub fn with_default_position_us(mut self, default_position_us: i64) -> Self {
        self.default_position_us = default_position_us;
        self
    }

    pub fn seekable(mut self, is_seekable: bool) -> Self {
        self.is_seekable = is_seekable;
        self
    }

    pub fn live(mut self, is_live: bool, is_dynamic: bool) -> Self {
        self.is_live = is_live;
        self.is_dynamic = is_dynamic;
        self
    }

    pub fn default_position_ms(&self) -> i64 {
        crate::us_to_ms(self.default_position_us)
    }

    pub fn duration_ms(&self) -> Option<i64> {
        self.duration_us.map(crate::us_to_ms)
    }

    pub fn period_count(&self) -> usize {
        self.last_period_index - self.first_period_index + 1
    }
}

/// A holder's child timeline placed inside a concatenated timeline
#[derive(Debug, Clone, PartialEq, Eq)]
struct Child {
    holder: Uuid,
    timeline: Arc<Timeline>,
    first_window: usize,
    first_period: usize,
}

/// Versioned composition of windows and periods
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    windows: Vec<Window>,
    periods: Vec<Period>,
    children: Vec<Child>,
    shuffle_order: ShuffleOrder,
}

impl Default for Timeline {
    fn default() -> Self {
        Self::empty()
    }
}

impl Timeline {
    pub fn empty() -> Self {
        Self {
            windows: Vec::new(),
            periods: Vec::new(),
            children: Vec::new(),
            shuffle_order: ShuffleOrder::unshuffled(0),
        }
    }

    /// Leaf timeline from windows and the periods each owns
    ///
    /// Window/period index links and period offsets inside each window are
    /// derived here; whatever the caller put in those fields is replaced.
    pub fn from_windows(entries: Vec<(Window, Vec<Period>)>) -> Result<Self> {
        let mut windows = Vec::with_capacity(entries.len());
        let mut periods = Vec::new();

        for (window_index, (mut window, window_periods)) in entries.into_iter().enumerate() {
            if window_periods.is_empty() {
                return Err(TimelineError::EmptyWindow(window_index));
            }
            window.first_period_index = periods.len();
            window.last_period_index = periods.len() + window_periods.len() - 1;

            let mut offset = -window.position_in_first_period_us;
            for mut period in window_periods {
                period.window_index = window_index;
                period.position_in_window_us = offset;
                offset += period.duration_us.unwrap_or(0);
                periods.push(period);
            }
            windows.push(window);
        }

        Ok(Self {
            shuffle_order: ShuffleOrder::unshuffled(windows.len()),
            windows,
            periods,
            children: Vec::new(),
        })
    }

    /// Single window with a single period spanning it
    pub fn single(media_item: MediaItem, duration_us: Option<i64>, is_seekable: bool) -> Self {
        let mut window = Window::new(Uid::local(0), media_item).seekable(is_seekable);
        let mut period = Period::new(Uid::local(0));
        window.duration_us = duration_us;
        period.duration_us = duration_us;
        window.last_period_index = 0;
        Self {
            windows: vec![window],
            periods: vec![period],
            children: Vec::new(),
            shuffle_order: ShuffleOrder::unshuffled(1),
        }
    }

    /// Stand-in timeline for a source that has not been prepared yet
    pub fn placeholder(media_item: MediaItem) -> Self {
        let duration_us = media_item
            .duration
            .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
        let mut timeline = Self::single(media_item, duration_us, false);
        timeline.windows[0].is_placeholder = true;
        timeline.windows[0].is_dynamic = true;
        timeline
    }

    /// Concatenate holder timelines in holder order
    ///
    /// Child UIDs are qualified by the holder UUID. `shuffle_order` must have
    /// one entry per child.
    pub fn concatenate(
        children: Vec<(Uuid, Arc<Timeline>)>,
        shuffle_order: ShuffleOrder,
    ) -> Result<Self> {
        if shuffle_order.len() != children.len() {
            return Err(TimelineError::ShuffleLengthMismatch {
                order: shuffle_order.len(),
                children: children.len(),
            });
        }

        let mut windows = Vec::new();
        let mut periods = Vec::new();
        let mut placed = Vec::with_capacity(children.len());

        for (holder, timeline) in children {
            let first_window = windows.len();
            let first_period = periods.len();

            for window in &timeline.windows {
                let mut window = window.clone();
                window.uid = Uid::qualified(holder, window.uid);
                window.first_period_index += first_period;
                window.last_period_index += first_period;
                windows.push(window);
            }
            for period in &timeline.periods {
                let mut period = period.clone();
                period.uid = Uid::qualified(holder, period.uid);
                period.window_index += first_window;
                periods.push(period);
            }

            placed.push(Child {
                holder,
                timeline,
                first_window,
                first_period,
            });
        }

        Ok(Self {
            windows,
            periods,
            children: placed,
            shuffle_order,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn period_count(&self) -> usize {
        self.periods.len()
    }

    pub fn window(&self, index: usize) -> Option<&Window> {
        self.windows.get(index)
    }

    pub fn period(&self, index: usize) -> Option<&Period> {
        self.periods.get(index)
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn shuffle_order(&self) -> &ShuffleOrder {
        &self.shuffle_order
    }

    pub fn index_of_period(&self, uid: &Uid) -> Option<usize> {
        self.periods.iter().position(|p| p.uid == *uid)
    }

    pub fn period_by_uid(&self, uid: &Uid) -> Option<&Period> {
        self.periods.iter().find(|p| p.uid == *uid)
    }

    /// Window owning the period with `uid`
    pub fn window_index_of_period(&self, uid: &Uid) -> Option<usize> {
        self.period_by_uid(uid).map(|p| p.window_index)
    }

    pub fn index_of_window(&self, uid: &Uid) -> Option<usize> {
        self.windows.iter().position(|w| w.uid == *uid)
    }

    /// Child timelines and their holders, in holder order
    pub fn child_timelines(&self) -> impl Iterator<Item = (Uuid, &Arc<Timeline>)> {
        self.children.iter().map(|c| (c.holder, &c.timeline))
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Resolve a window position to the period containing it
    ///
    /// `window_position_us` of `None` uses the window's default position.
    /// Returns the period UID and the position relative to that period.
    pub fn period_position_us(
        &self,
        window_index: usize,
        window_position_us: Option<i64>,
    ) -> Result<(Uid, i64)> {
        let window = self
            .windows
            .get(window_index)
            .ok_or(TimelineError::WindowOutOfBounds {
                index: window_index,
                count: self.windows.len(),
            })?;
        let position_us = window_position_us.unwrap_or(window.default_position_us);

        let mut period_index = window.first_period_index;
        while period_index < window.last_period_index
            && self.periods[period_index + 1].position_in_window_us <= position_us
        {
            period_index += 1;
        }
        let period = &self.periods[period_index];
        Ok((period.uid, position_us - period.position_in_window_us))
    }

    /// First window in play order
    pub fn first_window_index(&self, shuffled: bool) -> Option<usize> {
        if self.children.is_empty() {
            return (!self.windows.is_empty()).then_some(0);
        }
        let mut child = self.first_child(shuffled);
        while let Some(c) = child {
            if let Some(local) = self.children[c].timeline.first_window_index(shuffled) {
                return Some(self.children[c].first_window + local);
            }
            child = self.next_child(c, shuffled);
        }
        None
    }

    /// Last window in play order
    pub fn last_window_index(&self, shuffled: bool) -> Option<usize> {
        if self.children.is_empty() {
            return self.windows.len().checked_sub(1);
        }
        let mut child = self.last_child(shuffled);
        while let Some(c) = child {
            if let Some(local) = self.children[c].timeline.last_window_index(shuffled) {
                return Some(self.children[c].first_window + local);
            }
            child = self.previous_child(c, shuffled);
        }
        None
    }

    /// Window played after `window_index`, or `None` at the end
    pub fn next_window_index(
        &self,
        window_index: usize,
        repeat_mode: RepeatMode,
        shuffled: bool,
    ) -> Option<usize> {
        if window_index >= self.windows.len() {
            return None;
        }
        if self.children.is_empty() {
            return match repeat_mode {
                RepeatMode::One => Some(window_index),
                RepeatMode::Off => {
                    (window_index + 1 < self.windows.len()).then_some(window_index + 1)
                }
                RepeatMode::All if window_index + 1 == self.windows.len() => {
                    self.first_window_index(shuffled)
                }
                RepeatMode::All => Some(window_index + 1),
            };
        }

        let c = self.child_of_window(window_index);
        let child = &self.children[c];
        let child_repeat = if repeat_mode == RepeatMode::All {
            RepeatMode::Off
        } else {
            repeat_mode
        };
        if let Some(local) = child.timeline.next_window_index(
            window_index - child.first_window,
            child_repeat,
            shuffled,
        ) {
            return Some(child.first_window + local);
        }

        let mut next = self.next_child(c, shuffled);
        while let Some(n) = next {
            if let Some(local) = self.children[n].timeline.first_window_index(shuffled) {
                return Some(self.children[n].first_window + local);
            }
            next = self.next_child(n, shuffled);
        }
        match repeat_mode {
            RepeatMode::All => self.first_window_index(shuffled),
            _ => None,
        }
    }

    /// Window played before `window_index`, or `None` at the start
    pub fn previous_window_index(
        &self,
        window_index: usize,
        repeat_mode: RepeatMode,
        shuffled: bool,
    ) -> Option<usize> {
        if window_index >= self.windows.len() {
            return None;
        }
        if self.children.is_empty() {
            return match repeat_mode {
                RepeatMode::One => Some(window_index),
                RepeatMode::Off => window_index.checked_sub(1),
                RepeatMode::All if window_index == 0 => self.last_window_index(shuffled),
                RepeatMode::All => Some(window_index - 1),
            };
        }

        let c = self.child_of_window(window_index);
        let child = &self.children[c];
        let child_repeat = if repeat_mode == RepeatMode::All {
            RepeatMode::Off
        } else {
            repeat_mode
        };
        if let Some(local) = child.timeline.previous_window_index(
            window_index - child.first_window,
            child_repeat,
            shuffled,
        ) {
            return Some(child.first_window + local);
        }

        let mut previous = self.previous_child(c, shuffled);
        while let Some(p) = previous {
            if let Some(local) = self.children[p].timeline.last_window_index(shuffled) {
                return Some(self.children[p].first_window + local);
            }
            previous = self.previous_child(p, shuffled);
        }
        match repeat_mode {
            RepeatMode::All => self.last_window_index(shuffled),
            _ => None,
        }
    }

    /// Period played after `period_index`, crossing window boundaries
    pub fn next_period_index(
        &self,
        period_index: usize,
        repeat_mode: RepeatMode,
        shuffled: bool,
    ) -> Option<usize> {
        let period = self.periods.get(period_index)?;
        let window = &self.windows[period.window_index];
        if period_index < window.last_period_index {
            return Some(period_index + 1);
        }
        let next_window = self.next_window_index(period.window_index, repeat_mode, shuffled)?;
        Some(self.windows[next_window].first_period_index)
    }

    fn child_of_window(&self, window_index: usize) -> usize {
        // Last child starting at or before the window; empty children share
        // their start with the next non-empty child.
        let candidates = self
            .children
            .partition_point(|c| c.first_window <= window_index);
        (0..candidates)
            .rev()
            .find(|&c| !self.children[c].timeline.is_empty())
            .unwrap_or(0)
    }

    fn first_child(&self, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_order.first_index()
        } else {
            (!self.children.is_empty()).then_some(0)
        }
    }

    fn last_child(&self, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_order.last_index()
        } else {
            self.children.len().checked_sub(1)
        }
    }

    fn next_child(&self, child: usize, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_order.next_index(child)
        } else {
            (child + 1 < self.children.len()).then_some(child + 1)
        }
    }

    fn previous_child(&self, child: usize, shuffled: bool) -> Option<usize> {
        if shuffled {
            self.shuffle_order.previous_index(child)
        } else {
            child.checked_sub(1)
        }
    }
}

/// Find a period of `old` after `period_uid` that still exists in `new`
///
/// Walks `old` in play order from the given period and returns the first
/// period UID that `new` still contains.
pub fn resolve_subsequent_period(
    period_uid: &Uid,
    old: &Timeline,
    new: &Timeline,
    repeat_mode: RepeatMode,
    shuffled: bool,
) -> Option<Uid> {
    let mut old_index = old.index_of_period(period_uid)?;
    for _ in 0..old.period_count() {
        old_index = old.next_period_index(old_index, repeat_mode, shuffled)?;
        let uid = old.periods[old_index].uid;
        if new.index_of_period(&uid).is_some() {
            return Some(uid);
        }
    }
    None
}
