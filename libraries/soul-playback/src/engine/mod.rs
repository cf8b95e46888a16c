//! Execution engine interface
//!
//! The engine does the real work (loading, decoding, rendering) on its own
//! thread. The player forwards [`EngineCommand`]s to it and learns the
//! outcome only through [`PlaybackInfoUpdate`]s posted to its mailbox.

mod mailbox;
mod worker;

pub use mailbox::{mailbox, Mailbox, MailboxSender, PlaybackInfoUpdate};
pub use worker::{EngineOutput, EngineThread, PlaybackBackend};

use crate::error::Result;
use crate::playlist::SourceSnapshot;
use crate::renderer::PlayerMessage;
use crate::types::{PlaybackParameters, SuppressionReason};
use soul_timeline::{RepeatMode, ShuffleOrder, Timeline};
use std::sync::Arc;
use std::time::Duration;

/// Work forwarded to the execution engine
#[derive(Debug)]
pub enum EngineCommand {
    Prepare,

    SetMediaSources {
        sources: Vec<SourceSnapshot>,
        /// `None` starts at the default window
        start_window_index: Option<usize>,
        /// `None` starts at the window's default position
        start_position_us: Option<i64>,
        shuffle_order: ShuffleOrder,
    },

    AddMediaSources {
        index: usize,
        sources: Vec<SourceSnapshot>,
        shuffle_order: ShuffleOrder,
    },

    RemoveMediaSources {
        from: usize,
        to: usize,
        shuffle_order: ShuffleOrder,
    },

    MoveMediaSources {
        from: usize,
        to: usize,
        new_from: usize,
        shuffle_order: ShuffleOrder,
    },

    SetShuffleOrder(ShuffleOrder),

    /// Seek within the timeline the player masked against
    SeekTo {
        timeline: Arc<Timeline>,
        window_index: Option<usize>,
        position_us: Option<i64>,
    },

    SetPlayWhenReady {
        play_when_ready: bool,
        suppression_reason: SuppressionReason,
    },

    SetPlaybackParameters(PlaybackParameters),

    SetRepeatMode(RepeatMode),

    SetShuffleModeEnabled(bool),

    SetPauseAtEndOfWindow(bool),

    SetOffloadSchedulingEnabled(bool),

    Stop,

    /// Renderer message, delivered on the engine thread
    SendMessage(PlayerMessage),
}

impl EngineCommand {
    /// Whether the engine confirms this command with one operation ack
    ///
    /// Mode switches and renderer messages take effect without a
    /// confirmation of their own.
    pub fn acknowledges(&self) -> bool {
        !matches!(
            self,
            EngineCommand::SetRepeatMode(_)
                | EngineCommand::SetShuffleModeEnabled(_)
                | EngineCommand::SetPauseAtEndOfWindow(_)
                | EngineCommand::SetOffloadSchedulingEnabled(_)
                | EngineCommand::SendMessage(_)
        )
    }
}

/// Command side of an execution engine
pub trait ExecutionEngine: Send {
    /// Forward a command; fails only if the engine is gone
    fn submit(&mut self, command: EngineCommand) -> Result<()>;

    /// Switch foreground mode, waiting at most `timeout`
    ///
    /// Returns false if the engine did not confirm in time.
    fn set_foreground_mode(&mut self, foreground: bool, timeout: Option<Duration>) -> bool;

    /// Release every engine resource, waiting at most `timeout`
    ///
    /// Returns false if the engine did not confirm in time.
    fn release(&mut self, timeout: Duration) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::MessagePayload;

    #[test]
    fn mode_switches_are_not_acknowledged() {
        assert!(EngineCommand::Prepare.acknowledges());
        assert!(EngineCommand::Stop.acknowledges());
        assert!(EngineCommand::SetPlaybackParameters(PlaybackParameters::DEFAULT).acknowledges());
        assert!(!EngineCommand::SetRepeatMode(RepeatMode::All).acknowledges());
        assert!(!EngineCommand::SetShuffleModeEnabled(true).acknowledges());

        let (message, _receipt) = PlayerMessage::new(0, MessagePayload::Volume(1.0));
        assert!(!EngineCommand::SendMessage(message).acknowledges());
    }
}
