//! Playlist Model
//!
//! Ordered source holders plus the shuffle order over them. Every edit
//! updates both together and returns the freshly concatenated timeline, so the
//! caller can mask against it in the same step.
//!
//! Holders get a random UUID when added; timelines built from them qualify
//! window and period UIDs with it, so identities survive inserts, removals
//! and moves of other holders.

use crate::error::{PlaybackError, Result};
use soul_timeline::{MediaItem, ShuffleOrder, Timeline};
use std::sync::Arc;
use uuid::Uuid;

/// One playlist entry and the timeline its source contributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceHolder {
    pub uid: Uuid,
    pub media_item: MediaItem,
    /// Placeholder until the engine reports the source's real structure
    pub timeline: Arc<Timeline>,
}

impl SourceHolder {
    fn new(media_item: MediaItem) -> Self {
        Self {
            uid: Uuid::new_v4(),
            timeline: Arc::new(Timeline::placeholder(media_item.clone())),
            media_item,
        }
    }
}

/// What the engine needs to know about a holder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub uid: Uuid,
    pub media_item: MediaItem,
}

impl From<&SourceHolder> for SourceSnapshot {
    fn from(holder: &SourceHolder) -> Self {
        Self {
            uid: holder.uid,
            media_item: holder.media_item.clone(),
        }
    }
}

/// Ordered source holders with their shuffle order
#[derive(Debug, Clone)]
pub struct PlaylistModel {
    holders: Vec<SourceHolder>,
    shuffle_order: ShuffleOrder,
}

impl PlaylistModel {
    /// Empty playlist; the seed drives shuffle orders derived from edits
    pub fn new(shuffle_seed: u64) -> Self {
        Self {
            holders: Vec::new(),
            shuffle_order: ShuffleOrder::new(0, shuffle_seed),
        }
    }

    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn holders(&self) -> &[SourceHolder] {
        &self.holders
    }

    pub fn shuffle_order(&self) -> &ShuffleOrder {
        &self.shuffle_order
    }

    /// Engine view of the holders in `range`
    pub fn snapshots(&self, range: std::ops::Range<usize>) -> Vec<SourceSnapshot> {
        self.holders[range].iter().map(SourceSnapshot::from).collect()
    }

    /// Replace every holder
    pub fn set_all(&mut self, items: Vec<MediaItem>) -> Result<Timeline> {
        if !self.holders.is_empty() {
            self.remove(0, self.holders.len())?;
        }
        self.insert(0, items)
    }

    /// Insert holders at `index`, clamped to the holder count
    pub fn insert(&mut self, index: usize, items: Vec<MediaItem>) -> Result<Timeline> {
        let index = index.min(self.holders.len());
        let count = items.len();
        let tail = self.holders.split_off(index);
        self.holders.extend(items.into_iter().map(SourceHolder::new));
        self.holders.extend(tail);
        self.shuffle_order = self.shuffle_order.clone_and_insert(index, count);
        self.timeline()
    }

    /// Remove holders `from..to`
    pub fn remove(&mut self, from: usize, to: usize) -> Result<Timeline> {
        self.check_range(from, to)?;
        self.holders.drain(from..to);
        self.shuffle_order = self.shuffle_order.clone_and_remove(from, to);
        self.timeline()
    }

    /// Move holders `from..to` so the first lands at `new_from`
    ///
    /// `new_from` is clamped so the moved range fits.
    pub fn move_range(&mut self, from: usize, to: usize, new_from: usize) -> Result<Timeline> {
        self.check_range(from, to)?;
        let new_from = new_from.min(self.holders.len() - (to - from));
        let moved: Vec<SourceHolder> = self.holders.drain(from..to).collect();
        let tail = self.holders.split_off(new_from);
        self.holders.extend(moved);
        self.holders.extend(tail);
        self.shuffle_order = self.shuffle_order.clone_and_move(from, to, new_from);
        self.timeline()
    }

    /// Replace the shuffle order; its length must match the holder count
    pub fn set_shuffle_order(&mut self, shuffle_order: ShuffleOrder) -> Result<Timeline> {
        if shuffle_order.len() != self.holders.len() {
            return Err(PlaybackError::InvalidRange {
                from: 0,
                to: shuffle_order.len(),
                len: self.holders.len(),
            });
        }
        self.shuffle_order = shuffle_order;
        self.timeline()
    }

    /// Concatenation of the holder timelines in holder order
    pub fn timeline(&self) -> Result<Timeline> {
        let children = self
            .holders
            .iter()
            .map(|h| (h.uid, Arc::clone(&h.timeline)))
            .collect();
        Ok(Timeline::concatenate(children, self.shuffle_order.clone())?)
    }

    /// Adopt the child timelines of an authoritative timeline
    ///
    /// Returns false if the timeline does not line up with the holders, in
    /// which case nothing changes.
    pub fn refresh_from(&mut self, timeline: &Timeline) -> bool {
        if timeline.child_count() != self.holders.len() {
            return false;
        }
        let lines_up = timeline
            .child_timelines()
            .zip(&self.holders)
            .all(|((uid, _), holder)| uid == holder.uid);
        if !lines_up {
            return false;
        }
        for ((_, child), holder) in timeline.child_timelines().zip(self.holders.iter_mut()) {
            holder.timeline = Arc::clone(child);
        }
        true
    }

    fn check_range(&self, from: usize, to: usize) -> Result<()> {
        if from > to || to > self.holders.len() {
            return Err(PlaybackError::InvalidRange {
                from,
                to,
                len: self.holders.len(),
            });
        }
        Ok(())
    }
}
