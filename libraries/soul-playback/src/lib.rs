//! Soul Player - Playback State Synchronizer
//!
//! Keeps a caller-facing view of the player consistent while the real work
//! happens asynchronously on an execution engine thread.
//!
//! This crate provides:
//! - Playlist model with stable identity across insert/remove/move
//! - Masked snapshots, so every getter reflects the last command at once
//! - An operation ledger that absorbs stale engine confirmations
//! - Media item transition and position discontinuity classification
//! - Batched, ordered listener notifications
//! - Renderer messaging with bounded blocking delivery
//! - Available command computation
//!
//! # Architecture
//!
//! `soul-playback` does no decoding or output itself. The execution engine is
//! a trait ([`ExecutionEngine`]); [`EngineThread`] runs any
//! [`PlaybackBackend`] on a worker thread and reports back through the
//! player's mailbox.
//!
//! # Example: Masked Commands
//!
//! ```rust
//! use soul_playback::{
//!     EngineCommand, EngineOutput, EngineThread, PlaybackBackend, PlaybackConfig,
//!     PlaybackManager, PlaybackSnapshot, PlaybackState,
//! };
//! use soul_timeline::MediaItem;
//! use std::time::Duration;
//!
//! // Backend that confirms every command with an idle snapshot
//! struct IdleBackend;
//!
//! impl PlaybackBackend for IdleBackend {
//!     fn apply(&mut self, _command: EngineCommand) -> EngineOutput {
//!         EngineOutput::new(PlaybackSnapshot::initial())
//!     }
//! }
//!
//! let mut player = PlaybackManager::builder(PlaybackConfig::default())
//!     .build(|ctx| {
//!         EngineThread::spawn(IdleBackend, ctx.renderers, ctx.updates, Duration::from_millis(10))
//!     })
//!     .unwrap();
//!
//! player
//!     .set_media_items(vec![MediaItem::new("intro", "file:///music/intro.flac")], true)
//!     .unwrap();
//! player.prepare().unwrap();
//!
//! // Visible immediately, before the engine confirms anything
//! assert_eq!(player.get_playback_state(), PlaybackState::Buffering);
//! assert_eq!(player.get_media_item_count(), 1);
//!
//! player.release().unwrap();
//! ```
//!
//! # Example: Listening
//!
//! ```rust
//! use soul_playback::{ListenerAdapter, PlaybackState};
//!
//! let listener = ListenerAdapter::new()
//!     .on_playback_state(|state| println!("state: {state:?}"))
//!     .on_is_playing(|playing| println!("playing: {playing}"));
//! # let _ = listener;
//! ```

pub mod commands;
pub mod config;
pub mod engine;
mod error;
pub mod events;
mod ledger;
pub mod listener;
mod manager;
mod masking;
pub mod playlist;
pub mod renderer;
pub mod snapshot;
mod thread_guard;
pub mod transition;
pub mod types;

// Public exports
pub use commands::{Command, CommandContext, Commands};
pub use config::PlaybackConfig;
pub use engine::{
    EngineCommand, EngineOutput, EngineThread, ExecutionEngine, Mailbox, MailboxSender,
    PlaybackBackend, PlaybackInfoUpdate,
};
pub use error::{PlaybackError, PlayerError, PlayerErrorCode, Result, TimeoutOperation};
pub use events::{EventFlag, EventFlags, PlayerEvent};
pub use ledger::{OperationLedger, Settlement};
pub use listener::{ListenerAdapter, ListenerId, ListenerRegistry, OffloadListener, PlayerListener};
pub use manager::{EngineContext, PlaybackManager, PlaybackManagerBuilder};
pub use masking::{MaskingPosition, StateMasker};
pub use playlist::{PlaylistModel, SourceSnapshot};
pub use renderer::{DeliveryReceipt, MessagePayload, PlayerMessage, Renderer, RendererSet, VideoOutput};
pub use snapshot::{Format, PlaybackSnapshot, TrackGroup, Tracks};
pub use thread_guard::{ConstructionGate, GateOpener, ThreadGuard};
pub use types::{
    DiscontinuityReason, FormatSupport, MediaItemTransitionReason, PlayWhenReadyChangeReason,
    PlaybackParameters, PlaybackState, PositionInfo, SuppressionReason, TimelineChangeReason,
    TrackType, VideoScalingMode,
};
pub use soul_timeline::{MediaItem, MediaMetadata, PeriodId, RepeatMode, ShuffleOrder, Timeline};
