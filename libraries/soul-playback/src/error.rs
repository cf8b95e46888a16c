//! Error types for playback management

use serde::{Deserialize, Serialize};
use soul_timeline::TimelineError;
use thiserror::Error;

/// Usage errors returned synchronously by player commands
///
/// A command that fails with one of these leaves the player untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlaybackError {
    /// Player accessed from a thread other than its caller thread
    #[error("Player accessed on the wrong thread: current {current}, expected {expected}")]
    WrongThread { current: String, expected: String },

    /// Seek target outside a known, non-empty timeline
    #[error("Illegal seek position: window {window_index} of {window_count} at {position_ms:?}ms")]
    IllegalSeekPosition {
        window_index: usize,
        window_count: usize,
        position_ms: Option<i64>,
    },

    /// Playlist range outside `0..=len` or reversed
    #[error("Invalid playlist range {from}..{to} for {len} items")]
    InvalidRange { from: usize, to: usize, len: usize },

    /// Index out of bounds
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(usize),

    /// Player was released
    #[error("Player has been released")]
    Released,

    /// Execution engine is gone
    #[error("Execution engine disconnected")]
    EngineDisconnected,

    #[error("Failed to start execution engine: {0}")]
    EngineSpawn(String),

    /// Timeline construction failed
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Operation that exceeded its time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutOperation {
    /// Detaching the previous video output
    DetachOutput,
    /// Switching foreground mode
    SetForegroundMode,
    /// Releasing the execution engine
    Release,
}

/// Category of a player error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerErrorCode {
    Timeout(TimeoutOperation),
    Renderer,
    Source,
    Unexpected,
}

/// Error surfaced through the playback snapshot
///
/// These never come back from a command; they reach observers through the
/// error notification category.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct PlayerError {
    pub code: PlayerErrorCode,
    pub message: String,
}

impl PlayerError {
    pub fn new(code: PlayerErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn timeout(operation: TimeoutOperation) -> Self {
        let message = match operation {
            TimeoutOperation::DetachOutput => "Detaching the video output timed out",
            TimeoutOperation::SetForegroundMode => "Setting foreground mode timed out",
            TimeoutOperation::Release => "Releasing the player timed out",
        };
        Self::new(PlayerErrorCode::Timeout(operation), message)
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.code, PlayerErrorCode::Timeout(_))
    }
}
