//! Shuffle order over playlist holder indices
//!
//! A [`ShuffleOrder`] is a permutation of `0..len`. The playlist keeps one in
//! lock-step with its holders: every insert, remove or move of holders produces
//! a new order of the same length through the `clone_and_*` methods.
//!
//! New positions are drawn with a Fisher-Yates style insertion so that every
//! order is equally likely, and the generator is seeded so tests and replays
//! can reproduce a traversal.

use crate::error::{Result, TimelineError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Permutation governing non-linear traversal of playlist entries
#[derive(Debug, Clone)]
pub struct ShuffleOrder {
    /// Holder indices in play order
    shuffled: Vec<usize>,

    /// Inverse permutation: position of each holder index in `shuffled`
    index_in_shuffled: Vec<usize>,

    /// Seed for the next derived order
    seed: u64,
}

impl ShuffleOrder {
    /// Random order of `len` elements
    pub fn new(len: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut shuffled: Vec<usize> = (0..len).collect();
        shuffled.shuffle(&mut rng);
        Self::from_parts(shuffled, rng.gen())
    }

    /// Identity order, used when no explicit shuffle order was supplied
    pub fn unshuffled(len: usize) -> Self {
        Self::from_parts((0..len).collect(), 0)
    }

    /// Order built from an explicit permutation
    ///
    /// Fails if `shuffled` is not a permutation of `0..shuffled.len()`.
    pub fn from_shuffled(shuffled: Vec<usize>, seed: u64) -> Result<Self> {
        let mut seen = vec![false; shuffled.len()];
        for &index in &shuffled {
            match seen.get_mut(index) {
                Some(flag) if !*flag => *flag = true,
                _ => return Err(TimelineError::InvalidShuffleOrder(shuffled.len())),
            }
        }
        Ok(Self::from_parts(shuffled, seed))
    }

    fn from_parts(shuffled: Vec<usize>, seed: u64) -> Self {
        let mut index_in_shuffled = vec![0; shuffled.len()];
        for (position, &index) in shuffled.iter().enumerate() {
            index_in_shuffled[index] = position;
        }
        Self {
            shuffled,
            index_in_shuffled,
            seed,
        }
    }

    pub fn len(&self) -> usize {
        self.shuffled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shuffled.is_empty()
    }

    /// Holder indices in play order
    pub fn as_slice(&self) -> &[usize] {
        &self.shuffled
    }

    pub fn first_index(&self) -> Option<usize> {
        self.shuffled.first().copied()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.shuffled.last().copied()
    }

    /// Index played after `index`, or `None` at the end of the order
    pub fn next_index(&self, index: usize) -> Option<usize> {
        let position = *self.index_in_shuffled.get(index)?;
        self.shuffled.get(position + 1).copied()
    }

    /// Index played before `index`, or `None` at the start of the order
    pub fn previous_index(&self, index: usize) -> Option<usize> {
        let position = *self.index_in_shuffled.get(index)?;
        position
            .checked_sub(1)
            .and_then(|p| self.shuffled.get(p).copied())
    }

    /// New order with `count` indices inserted starting at `insertion_index`
    ///
    /// Existing indices at or after the insertion point shift up by `count`.
    /// The inserted indices land at random positions.
    pub fn clone_and_insert(&self, insertion_index: usize, count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut insertion_points: Vec<usize> = (0..count)
            .map(|_| rng.gen_range(0..=self.shuffled.len()))
            .collect();
        insertion_points.sort_unstable();

        let mut insertion_values: Vec<usize> =
            (insertion_index..insertion_index + count).collect();
        insertion_values.shuffle(&mut rng);

        let mut shuffled = Vec::with_capacity(self.shuffled.len() + count);
        let mut inserted = 0;
        for (position, &old) in self.shuffled.iter().enumerate() {
            while inserted < count && insertion_points[inserted] == position {
                shuffled.push(insertion_values[inserted]);
                inserted += 1;
            }
            shuffled.push(if old >= insertion_index { old + count } else { old });
        }
        shuffled.extend_from_slice(&insertion_values[inserted..]);

        Self::from_parts(shuffled, rng.gen())
    }

    /// New order without the indices in `from..to`
    pub fn clone_and_remove(&self, from: usize, to: usize) -> Self {
        let removed = to.saturating_sub(from);
        let shuffled = self
            .shuffled
            .iter()
            .filter(|&&index| index < from || index >= to)
            .map(|&index| if index >= to { index - removed } else { index })
            .collect();
        Self::from_parts(shuffled, self.seed)
    }

    /// New order reflecting a move of holders `from..to` to start at `new_from`
    ///
    /// The moved holders keep their slots in play order; only their indices
    /// are renumbered.
    pub fn clone_and_move(&self, from: usize, to: usize, new_from: usize) -> Self {
        let len = self.shuffled.len();
        let mut holders: Vec<usize> = (0..len).collect();
        let moved: Vec<usize> = holders.drain(from..to).collect();
        let at = new_from.min(holders.len());
        holders.splice(at..at, moved);

        // holders[new] = old; invert to map old -> new
        let mut new_index_of = vec![0; len];
        for (new, &old) in holders.iter().enumerate() {
            new_index_of[old] = new;
        }
        let shuffled = self.shuffled.iter().map(|&old| new_index_of[old]).collect();
        Self::from_parts(shuffled, self.seed)
    }

    /// Empty order keeping the seed
    pub fn clone_and_clear(&self) -> Self {
        Self::from_parts(Vec::new(), self.seed)
    }
}

impl PartialEq for ShuffleOrder {
    fn eq(&self, other: &Self) -> bool {
        self.shuffled == other.shuffled
    }
}

impl Eq for ShuffleOrder {}
