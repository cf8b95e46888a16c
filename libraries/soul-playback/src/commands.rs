//! Capability Set
//!
//! Which public operations are legal right now. A fixed permanent subset is
//! chosen at construction from the renderers present; the rest is derived
//! from the current item after every transition.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Public player operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Command {
    PlayPause,
    Prepare,
    Stop,
    SeekToDefaultPosition,
    SeekInCurrentMediaItem,
    SeekToPreviousMediaItem,
    SeekToPrevious,
    SeekToNextMediaItem,
    SeekToNext,
    SeekToMediaItem,
    SeekBack,
    SeekForward,
    SetSpeedAndPitch,
    SetShuffleMode,
    SetRepeatMode,
    GetCurrentMediaItem,
    GetTimeline,
    GetMediaItemsMetadata,
    SetMediaItemsMetadata,
    ChangeMediaItems,
    GetTracks,
    GetVolume,
    SetVolume,
    SetVideoSurface,
    GetText,
}

/// Facts about the current item the derived commands depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandContext {
    pub is_playing_ad: bool,
    pub is_current_item_seekable: bool,
    pub has_previous_item: bool,
    pub has_next_item: bool,
    pub is_current_item_live: bool,
    pub is_current_item_dynamic: bool,
    pub is_timeline_empty: bool,
}

/// Set of available commands
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commands {
    set: BTreeSet<Command>,
}

impl Commands {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands available regardless of playback state
    ///
    /// Volume, video output and text commands need a renderer of the
    /// matching track type.
    pub fn permanent(has_audio: bool, has_video: bool, has_text: bool) -> Self {
        let mut commands = Self::new();
        for command in [
            Command::PlayPause,
            Command::Prepare,
            Command::Stop,
            Command::SetSpeedAndPitch,
            Command::SetShuffleMode,
            Command::SetRepeatMode,
            Command::GetCurrentMediaItem,
            Command::GetTimeline,
            Command::GetMediaItemsMetadata,
            Command::SetMediaItemsMetadata,
            Command::ChangeMediaItems,
            Command::GetTracks,
            Command::GetVolume,
        ] {
            commands.insert(command);
        }
        commands.insert_if(Command::SetVolume, has_audio);
        commands.insert_if(Command::SetVideoSurface, has_video);
        commands.insert_if(Command::GetText, has_text);
        commands
    }

    /// Permanent commands plus those the current item allows
    pub fn available(permanent: &Commands, context: &CommandContext) -> Self {
        let free = !context.is_playing_ad;
        let seekable = context.is_current_item_seekable && free;
        let mut commands = permanent.clone();

        commands.insert_if(Command::SeekToDefaultPosition, free);
        commands.insert_if(Command::SeekInCurrentMediaItem, seekable);
        commands.insert_if(
            Command::SeekToPreviousMediaItem,
            context.has_previous_item && free,
        );
        commands.insert_if(
            Command::SeekToPrevious,
            !context.is_timeline_empty
                && (context.has_previous_item
                    || !context.is_current_item_live
                    || context.is_current_item_seekable)
                && free,
        );
        commands.insert_if(Command::SeekToNextMediaItem, context.has_next_item && free);
        commands.insert_if(
            Command::SeekToNext,
            !context.is_timeline_empty
                && (context.has_next_item
                    || (context.is_current_item_live && context.is_current_item_dynamic))
                && free,
        );
        commands.insert_if(Command::SeekToMediaItem, free);
        commands.insert_if(Command::SeekBack, seekable);
        commands.insert_if(Command::SeekForward, seekable);
        commands
    }

    pub fn insert(&mut self, command: Command) {
        self.set.insert(command);
    }

    pub fn insert_if(&mut self, command: Command, condition: bool) {
        if condition {
            self.set.insert(command);
        }
    }

    pub fn contains(&self, command: Command) -> bool {
        self.set.contains(&command)
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Command> + '_ {
        self.set.iter().copied()
    }
}
