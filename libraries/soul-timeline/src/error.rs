//! Error types for timeline construction and queries

use thiserror::Error;

/// Timeline errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// Window index outside the timeline
    #[error("Window index {index} out of bounds for {count} windows")]
    WindowOutOfBounds { index: usize, count: usize },

    /// Period UID does not resolve against the timeline
    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    /// A window must own at least one period
    #[error("Window {0} has no periods")]
    EmptyWindow(usize),

    /// Shuffle order is not a permutation
    #[error("Shuffle order of length {0} is not a permutation")]
    InvalidShuffleOrder(usize),

    /// Shuffle order length differs from the number of children
    #[error("Shuffle order length {order} does not match {children} children")]
    ShuffleLengthMismatch { order: usize, children: usize },
}

/// Result type for timeline operations
pub type Result<T> = std::result::Result<T, TimelineError>;
