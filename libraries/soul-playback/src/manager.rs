//! Playback manager - core orchestration
//!
//! Ties the playlist, masking, ledger and notification pieces together
//! behind the public player API. Every command:
//! 1. checks the calling thread
//! 2. edits the playlist if needed and masks the snapshot
//! 3. records the command in the ledger and forwards it to the engine
//! 4. diffs the masked snapshot against the previous one and flushes the
//!    resulting events as one batch
//!
//! Engine confirmations are picked up by
//! [`PlaybackManager::process_pending_updates`] and go through the same diff
//! once the ledger has settled.

use crate::{
    commands::{Command, CommandContext, Commands},
    config::PlaybackConfig,
    engine::{mailbox, EngineCommand, ExecutionEngine, Mailbox, MailboxSender, PlaybackInfoUpdate},
    error::{PlaybackError, PlayerError, Result, TimeoutOperation},
    events::{NotificationBatcher, PlayerEvent},
    ledger::OperationLedger,
    listener::{ListenerId, ListenerRegistry, OffloadListener, PlayerListener},
    masking::{PeriodPosition, StateMasker},
    playlist::PlaylistModel,
    renderer::{
        DeliveryReceipt, MessagePayload, PlayerMessage, Renderer, RendererSet, VideoOutput,
    },
    snapshot::{PlaybackSnapshot, Tracks},
    thread_guard::{ConstructionGate, ThreadGuard},
    transition::{classify_media_item_transition, current_position_info, previous_position_info},
    types::{
        DiscontinuityReason, PlayWhenReadyChangeReason, PlaybackParameters, PlaybackState,
        SuppressionReason, TimelineChangeReason, TrackType, VideoScalingMode,
    },
};
use soul_timeline::{
    ms_to_us, us_to_ms, MediaItem, MediaMetadata, PeriodId, RepeatMode, ShuffleOrder, Timeline,
};
use std::sync::Arc;
use std::thread::ThreadId;
use std::time::Duration;

/// What the engine factory gets to wire itself up
#[derive(Debug, Clone)]
pub struct EngineContext {
    /// Where the engine posts its confirmations
    pub updates: MailboxSender,
    /// Renderers the engine delivers messages to
    pub renderers: RendererSet,
}

/// Builder for [`PlaybackManager`]
pub struct PlaybackManagerBuilder {
    config: PlaybackConfig,
    renderers: Vec<Arc<dyn Renderer>>,
    caller_thread: Option<ThreadId>,
}

impl PlaybackManagerBuilder {
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderers.push(renderer);
        self
    }

    /// Thread the player will be used from; defaults to the building thread
    #[must_use]
    pub fn caller_thread(mut self, thread: ThreadId) -> Self {
        self.caller_thread = Some(thread);
        self
    }

    /// Build the player around the engine returned by `engine_factory`
    ///
    /// The thread guard's construction gate stays closed until this returns.
    /// The player is not reachable before then, so the gate only matters to
    /// guards shared while it is closed.
    pub fn build<E, F>(self, engine_factory: F) -> Result<PlaybackManager>
    where
        E: ExecutionEngine + 'static,
        F: FnOnce(EngineContext) -> Result<E>,
    {
        self.config.validate()?;
        let (gate, _opener) = ConstructionGate::new();
        let fail_on_wrong_thread = self.config.fail_on_wrong_thread;
        let guard = match self.caller_thread {
            Some(thread) => ThreadGuard::new(thread, fail_on_wrong_thread, gate),
            None => ThreadGuard::current(fail_on_wrong_thread, gate),
        };

        let renderers = RendererSet::new(self.renderers);
        let (updates, mailbox) = mailbox();
        let engine = engine_factory(EngineContext {
            updates: updates.clone(),
            renderers: renderers.clone(),
        })?;

        let permanent_commands = Commands::permanent(
            renderers.has_track_type(TrackType::Audio),
            renderers.has_track_type(TrackType::Video),
            renderers.has_track_type(TrackType::Text),
        );
        let available_commands = Commands::available(
            &permanent_commands,
            &CommandContext {
                is_timeline_empty: true,
                ..Default::default()
            },
        );
        let shuffle_seed = self.config.shuffle_seed.unwrap_or_else(rand::random);

        let mut manager = PlaybackManager {
            guard,
            engine: Box::new(engine),
            mailbox,
            self_updates: updates,
            renderers,
            listeners: ListenerRegistry::new(),
            batcher: NotificationBatcher::new(),
            playlist: PlaylistModel::new(shuffle_seed),
            snapshot: PlaybackSnapshot::initial(),
            masker: StateMasker::new(),
            ledger: OperationLedger::new(),
            repeat_mode: self.config.repeat_mode,
            shuffle_mode_enabled: self.config.shuffle_mode_enabled,
            pause_at_end_of_media_items: self.config.pause_at_end_of_media_items,
            permanent_commands,
            available_commands,
            media_metadata: MediaMetadata::EMPTY,
            static_and_dynamic_metadata: MediaMetadata::EMPTY,
            playlist_metadata: MediaMetadata::EMPTY,
            volume: self.config.volume,
            audio_session_id: 0,
            skip_silence_enabled: false,
            video_scaling_mode: VideoScalingMode::default(),
            video_output: None,
            foreground_mode: false,
            released: false,
            config: self.config,
        };
        manager.push_initial_settings()?;

        tracing::info!(
            renderers = manager.renderers.len(),
            repeat_mode = ?manager.repeat_mode,
            shuffle = manager.shuffle_mode_enabled,
            "Playback manager created"
        );
        Ok(manager)
    }
}

/// Player facade with immediately consistent reads
///
/// Owned and used by one caller thread. The execution engine reports back
/// through a mailbox that the caller drains with
/// [`process_pending_updates`](Self::process_pending_updates).
pub struct PlaybackManager {
    config: PlaybackConfig,
    guard: ThreadGuard,
    engine: Box<dyn ExecutionEngine>,
    mailbox: Mailbox,
    /// Posts to our own mailbox, for commands confirmed without the engine
    self_updates: MailboxSender,
    renderers: RendererSet,
    listeners: ListenerRegistry,
    batcher: NotificationBatcher,

    playlist: PlaylistModel,
    snapshot: PlaybackSnapshot,
    masker: StateMasker,
    ledger: OperationLedger,

    repeat_mode: RepeatMode,
    shuffle_mode_enabled: bool,
    pause_at_end_of_media_items: bool,
    permanent_commands: Commands,
    available_commands: Commands,

    /// Current item metadata overlaid with stream metadata
    media_metadata: MediaMetadata,
    /// Stream metadata of the current item
    static_and_dynamic_metadata: MediaMetadata,
    playlist_metadata: MediaMetadata,

    volume: f32,
    audio_session_id: u32,
    skip_silence_enabled: bool,
    video_scaling_mode: VideoScalingMode,
    video_output: Option<VideoOutput>,
    foreground_mode: bool,
    released: bool,
}

/// How one snapshot transition is reported
struct Transition {
    timeline_change_reason: TimelineChangeReason,
    play_when_ready_change_reason: PlayWhenReadyChangeReason,
    seek_processed: bool,
    /// Reason and window-relative start position of a discontinuity
    discontinuity: Option<(DiscontinuityReason, i64)>,
    old_masking_window_index: Option<usize>,
}

impl Transition {
    fn user_request() -> Self {
        Self {
            timeline_change_reason: TimelineChangeReason::PlaylistChanged,
            play_when_ready_change_reason: PlayWhenReadyChangeReason::UserRequest,
            seek_processed: false,
            discontinuity: None,
            old_masking_window_index: None,
        }
    }

    fn with_discontinuity_if(
        mut self,
        condition: bool,
        reason: DiscontinuityReason,
        window_start_position_us: i64,
    ) -> Self {
        if condition {
            self.discontinuity = Some((reason, window_start_position_us));
        }
        self
    }
}

impl PlaybackManager {
    pub fn builder(config: PlaybackConfig) -> PlaybackManagerBuilder {
        PlaybackManagerBuilder {
            config,
            renderers: Vec::new(),
            caller_thread: None,
        }
    }

    fn push_initial_settings(&mut self) -> Result<()> {
        if self.repeat_mode != RepeatMode::Off {
            self.submit(EngineCommand::SetRepeatMode(self.repeat_mode))?;
        }
        if self.shuffle_mode_enabled {
            self.submit(EngineCommand::SetShuffleModeEnabled(true))?;
        }
        if self.pause_at_end_of_media_items {
            self.submit(EngineCommand::SetPauseAtEndOfWindow(true))?;
        }
        if (self.volume - 1.0).abs() > f32::EPSILON {
            self.send_to_renderers(TrackType::Audio, &MessagePayload::Volume(self.volume))?;
        }
        Ok(())
    }

    // ===== Listeners =====

    /// Add a listener; valid from any thread
    pub fn add_listener(&self, listener: Box<dyn PlayerListener>) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn add_offload_listener(&self, listener: Box<dyn OffloadListener>) -> ListenerId {
        self.listeners.add_offload(listener)
    }

    pub fn remove_offload_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove_offload(id)
    }

    /// Handle for adding and removing listeners from other threads
    pub fn listener_registry(&self) -> ListenerRegistry {
        self.listeners.clone()
    }

    // ===== Playlist =====

    /// Replace the playlist
    ///
    /// With `reset_position` playback starts at the default position of the
    /// first item; otherwise the current index and position are kept.
    pub fn set_media_items(&mut self, items: Vec<MediaItem>, reset_position: bool) -> Result<()> {
        self.verify_command()?;
        self.set_media_items_internal(items, None, None, reset_position)
    }

    /// Replace the playlist and start at `start_index`
    ///
    /// A `start_position_ms` of `None` starts at the item's default position.
    pub fn set_media_items_at(
        &mut self,
        items: Vec<MediaItem>,
        start_index: usize,
        start_position_ms: Option<i64>,
    ) -> Result<()> {
        self.verify_command()?;
        self.set_media_items_internal(items, Some(start_index), start_position_ms, false)
    }

    pub fn set_media_item(&mut self, item: MediaItem) -> Result<()> {
        self.set_media_items(vec![item], true)
    }

    pub fn add_media_item(&mut self, item: MediaItem) -> Result<()> {
        self.add_media_items(vec![item])
    }

    pub fn add_media_items(&mut self, items: Vec<MediaItem>) -> Result<()> {
        self.add_media_items_at(usize::MAX, items)
    }

    /// Insert items at `index`, clamped to the playlist length
    pub fn add_media_items_at(&mut self, index: usize, items: Vec<MediaItem>) -> Result<()> {
        self.verify_command()?;
        let index = index.min(self.playlist.len());
        let count = items.len();
        let old_timeline = Arc::clone(&self.snapshot.timeline);
        let mut playlist = self.playlist.clone();
        let timeline = Arc::new(playlist.insert(index, items)?);
        self.submit(EngineCommand::AddMediaSources {
            index,
            sources: playlist.snapshots(index..index + count),
            shuffle_order: playlist.shuffle_order().clone(),
        })?;
        self.playlist = playlist;

        let position = self.period_position_after_timeline_changed(&old_timeline, &timeline);
        let masked = self
            .masker
            .mask_timeline_and_position(&self.snapshot, timeline, position);
        self.update_playback_info(masked, Transition::user_request());
        Ok(())
    }

    pub fn remove_media_item(&mut self, index: usize) -> Result<()> {
        let to = self.index_after(index)?;
        self.remove_media_items(index, to)
    }

    /// Remove items `from..to`
    pub fn remove_media_items(&mut self, from: usize, to: usize) -> Result<()> {
        self.verify_command()?;
        let old_period_uid = self.snapshot.period_id.period_uid;
        let masked = self.remove_media_items_internal(from, to)?;
        let period_changed = masked.period_id.period_uid != old_period_uid;
        let window_start_us = self.masker.current_position_us(&masked);
        self.update_playback_info(
            masked,
            Transition::user_request().with_discontinuity_if(
                period_changed,
                DiscontinuityReason::Remove,
                window_start_us,
            ),
        );
        Ok(())
    }

    pub fn clear_media_items(&mut self) -> Result<()> {
        self.remove_media_items(0, self.playlist.len())
    }

    pub fn move_media_item(&mut self, index: usize, new_index: usize) -> Result<()> {
        let to = self.index_after(index)?;
        self.move_media_items(index, to, new_index)
    }

    /// End of the one-item range starting at `index`
    fn index_after(&self, index: usize) -> Result<usize> {
        index.checked_add(1).ok_or(PlaybackError::InvalidRange {
            from: index,
            to: index,
            len: self.playlist.len(),
        })
    }

    /// Move items `from..to` so the first lands at `new_from`
    ///
    /// `new_from` is clamped so the moved range stays inside the playlist.
    pub fn move_media_items(&mut self, from: usize, to: usize, new_from: usize) -> Result<()> {
        self.verify_command()?;
        let old_timeline = Arc::clone(&self.snapshot.timeline);
        let mut playlist = self.playlist.clone();
        let timeline = Arc::new(playlist.move_range(from, to, new_from)?);
        let new_from = new_from.min(playlist.len() - (to - from));
        self.submit(EngineCommand::MoveMediaSources {
            from,
            to,
            new_from,
            shuffle_order: playlist.shuffle_order().clone(),
        })?;
        self.playlist = playlist;

        let position = self.period_position_after_timeline_changed(&old_timeline, &timeline);
        let masked = self
            .masker
            .mask_timeline_and_position(&self.snapshot, timeline, position);
        self.update_playback_info(masked, Transition::user_request());
        Ok(())
    }

    /// Replace the shuffle order; its length must match the playlist
    pub fn set_shuffle_order(&mut self, shuffle_order: ShuffleOrder) -> Result<()> {
        self.verify_command()?;
        let mut playlist = self.playlist.clone();
        let timeline = Arc::new(playlist.set_shuffle_order(shuffle_order.clone())?);
        self.submit(EngineCommand::SetShuffleOrder(shuffle_order))?;
        self.playlist = playlist;

        let position = self.masker.mask_window_position(
            &timeline,
            Some(self.get_current_media_item_index()),
            Some(self.get_current_position_ms()),
            self.shuffle_mode_enabled,
        );
        let masked = self
            .masker
            .mask_timeline_and_position(&self.snapshot, timeline, position);
        self.update_playback_info(masked, Transition::user_request());
        Ok(())
    }

    pub fn set_playlist_metadata(&mut self, metadata: MediaMetadata) -> Result<()> {
        self.verify_command()?;
        if metadata == self.playlist_metadata {
            return Ok(());
        }
        self.playlist_metadata = metadata.clone();
        self.batcher
            .queue(PlayerEvent::PlaylistMetadataChanged { metadata });
        self.flush_events();
        Ok(())
    }

    fn set_media_items_internal(
        &mut self,
        items: Vec<MediaItem>,
        start_index: Option<usize>,
        start_position_ms: Option<i64>,
        reset_position: bool,
    ) -> Result<()> {
        let current_index = self.masker.current_window_index(&self.snapshot);
        let current_position_ms = self.get_current_position_ms();

        let mut playlist = self.playlist.clone();
        let timeline = Arc::new(playlist.set_all(items)?);
        if let Some(index) = start_index {
            if !timeline.is_empty() && index >= timeline.window_count() {
                return Err(PlaybackError::IllegalSeekPosition {
                    window_index: index,
                    window_count: timeline.window_count(),
                    position_ms: start_position_ms,
                });
            }
        }

        let (start_index, start_position_ms) = if reset_position {
            (timeline.first_window_index(self.shuffle_mode_enabled), None)
        } else if start_index.is_none() {
            (current_index, Some(current_position_ms))
        } else {
            (start_index, start_position_ms)
        };
        self.submit(EngineCommand::SetMediaSources {
            sources: playlist.snapshots(0..playlist.len()),
            start_window_index: start_index,
            start_position_us: start_position_ms.map(ms_to_us),
            shuffle_order: playlist.shuffle_order().clone(),
        })?;
        self.playlist = playlist;

        let position = self.masker.mask_window_position(
            &timeline,
            start_index,
            start_position_ms,
            self.shuffle_mode_enabled,
        );
        let mut masked =
            self.masker
                .mask_timeline_and_position(&self.snapshot, Arc::clone(&timeline), position);
        if let Some(index) = start_index {
            if masked.playback_state != PlaybackState::Idle {
                let state = if timeline.is_empty() || index >= timeline.window_count() {
                    PlaybackState::Ended
                } else {
                    PlaybackState::Buffering
                };
                masked = masked.with_masked_playback_state(state);
            }
        }

        let period_changed = masked.period_id.period_uid != self.snapshot.period_id.period_uid
            && !self.snapshot.timeline.is_empty();
        let window_start_us = self.masker.current_position_us(&masked);
        self.update_playback_info(
            masked,
            Transition::user_request().with_discontinuity_if(
                period_changed,
                DiscontinuityReason::Remove,
                window_start_us,
            ),
        );
        Ok(())
    }

    fn remove_media_items_internal(&mut self, from: usize, to: usize) -> Result<PlaybackSnapshot> {
        let current_index = self.get_current_media_item_index();
        let holder_count = self.playlist.len();
        let old_timeline = Arc::clone(&self.snapshot.timeline);
        let mut playlist = self.playlist.clone();
        let timeline = Arc::new(playlist.remove(from, to)?);
        self.submit(EngineCommand::RemoveMediaSources {
            from,
            to,
            shuffle_order: playlist.shuffle_order().clone(),
        })?;
        self.playlist = playlist;

        let position = self.period_position_after_timeline_changed(&old_timeline, &timeline);
        let mut masked = self
            .masker
            .mask_timeline_and_position(&self.snapshot, timeline, position);

        // Removing every item from the current one to the end ends playback
        let transitions_to_ended =
            !matches!(masked.playback_state, PlaybackState::Idle | PlaybackState::Ended)
                && from < to
                && to == holder_count
                && current_index >= masked.timeline.window_count();
        if transitions_to_ended {
            masked = masked.with_masked_playback_state(PlaybackState::Ended);
        }
        Ok(masked)
    }

    fn period_position_after_timeline_changed(
        &mut self,
        old: &Timeline,
        new: &Timeline,
    ) -> Option<PeriodPosition> {
        let current_index = self.masker.current_window_index(&self.snapshot);
        let content_position_ms = self.masker.content_position_ms(&self.snapshot);
        self.masker.period_position_after_timeline_changed(
            old,
            new,
            current_index,
            content_position_ms,
            self.repeat_mode,
            self.shuffle_mode_enabled,
        )
    }

    // ===== Playback Control =====

    /// Start loading; only has an effect while idle
    pub fn prepare(&mut self) -> Result<()> {
        self.verify_command()?;
        if self.snapshot.playback_state != PlaybackState::Idle {
            return Ok(());
        }
        let state = if self.snapshot.timeline.is_empty() {
            PlaybackState::Ended
        } else {
            PlaybackState::Buffering
        };
        let masked = self
            .snapshot
            .clone()
            .with_playback_error(None)
            .with_masked_playback_state(state);
        self.submit(EngineCommand::Prepare)?;
        self.update_playback_info(masked, Transition::user_request());
        Ok(())
    }

    /// Prepare again after an error
    pub fn retry(&mut self) -> Result<()> {
        self.prepare()
    }

    pub fn play(&mut self) -> Result<()> {
        self.set_play_when_ready(true)
    }

    pub fn pause(&mut self) -> Result<()> {
        self.set_play_when_ready(false)
    }

    pub fn set_play_when_ready(&mut self, play_when_ready: bool) -> Result<()> {
        self.set_play_when_ready_with(
            play_when_ready,
            SuppressionReason::None,
            PlayWhenReadyChangeReason::UserRequest,
        )
    }

    /// Set play-when-ready on behalf of an audio focus or routing change
    pub fn set_play_when_ready_with(
        &mut self,
        play_when_ready: bool,
        suppression_reason: SuppressionReason,
        reason: PlayWhenReadyChangeReason,
    ) -> Result<()> {
        self.verify_command()?;
        if self.snapshot.play_when_ready == play_when_ready
            && self.snapshot.suppression_reason == suppression_reason
        {
            return Ok(());
        }
        let masked =
            self.snapshot
                .clone()
                .with_play_when_ready(play_when_ready, reason, suppression_reason);
        self.submit(EngineCommand::SetPlayWhenReady {
            play_when_ready,
            suppression_reason,
        })?;
        let mut transition = Transition::user_request();
        transition.play_when_ready_change_reason = reason;
        self.update_playback_info(masked, transition);
        Ok(())
    }

    pub fn set_playback_parameters(&mut self, parameters: PlaybackParameters) -> Result<()> {
        self.verify_command()?;
        if self.snapshot.playback_parameters == parameters {
            return Ok(());
        }
        let masked = self.snapshot.clone().with_playback_parameters(parameters);
        self.submit(EngineCommand::SetPlaybackParameters(parameters))?;
        self.update_playback_info(masked, Transition::user_request());
        Ok(())
    }

    pub fn set_playback_speed(&mut self, speed: f32) -> Result<()> {
        let pitch = self.snapshot.playback_parameters.pitch;
        self.set_playback_parameters(PlaybackParameters::new(speed, pitch))
    }

    pub fn set_repeat_mode(&mut self, repeat_mode: RepeatMode) -> Result<()> {
        self.verify_command()?;
        if self.repeat_mode == repeat_mode {
            return Ok(());
        }
        self.submit(EngineCommand::SetRepeatMode(repeat_mode))?;
        self.repeat_mode = repeat_mode;
        self.batcher
            .queue(PlayerEvent::RepeatModeChanged { repeat_mode });
        self.update_available_commands();
        self.flush_events();
        Ok(())
    }

    pub fn set_shuffle_mode_enabled(&mut self, enabled: bool) -> Result<()> {
        self.verify_command()?;
        if self.shuffle_mode_enabled == enabled {
            return Ok(());
        }
        self.submit(EngineCommand::SetShuffleModeEnabled(enabled))?;
        self.shuffle_mode_enabled = enabled;
        self.batcher
            .queue(PlayerEvent::ShuffleModeEnabledChanged { enabled });
        self.update_available_commands();
        self.flush_events();
        Ok(())
    }

    pub fn set_pause_at_end_of_media_items(&mut self, pause: bool) -> Result<()> {
        self.verify_command()?;
        if self.pause_at_end_of_media_items == pause {
            return Ok(());
        }
        self.submit(EngineCommand::SetPauseAtEndOfWindow(pause))?;
        self.pause_at_end_of_media_items = pause;
        Ok(())
    }

    /// Keep engine resources while idle; a timeout stops the player with an
    /// error
    pub fn set_foreground_mode(&mut self, foreground: bool) -> Result<()> {
        self.verify_command()?;
        if self.foreground_mode == foreground {
            return Ok(());
        }
        self.foreground_mode = foreground;
        let timeout = self.config.foreground_mode_timeout();
        if !self.engine.set_foreground_mode(foreground, timeout) {
            tracing::error!(foreground, "Setting foreground mode timed out");
            self.stop_internal(false, Some(PlayerError::timeout(TimeoutOperation::SetForegroundMode)))?;
        }
        Ok(())
    }

    pub fn experimental_set_offload_scheduling_enabled(&mut self, enabled: bool) -> Result<()> {
        self.verify_command()?;
        self.submit(EngineCommand::SetOffloadSchedulingEnabled(enabled))
    }

    /// Stop playback, keeping the playlist and position
    pub fn stop(&mut self) -> Result<()> {
        self.verify_command()?;
        self.stop_internal(false, None)
    }

    /// Stop playback and clear the playlist, error and position
    pub fn stop_and_reset(&mut self) -> Result<()> {
        self.verify_command()?;
        self.stop_internal(true, None)
    }

    fn stop_internal(&mut self, reset: bool, error: Option<PlayerError>) -> Result<()> {
        let masked = if reset {
            self.remove_media_items_internal(0, self.playlist.len())?
                .with_playback_error(None)
        } else {
            self.snapshot.clone().with_loading_stopped()
        };
        let emptied = masked.timeline.is_empty() && !self.snapshot.timeline.is_empty();

        // The removal already reached the engine, so it is published either way
        let stopped = self.submit(EngineCommand::Stop);
        let masked = if stopped.is_ok() {
            let masked = masked.with_masked_playback_state(PlaybackState::Idle);
            match error {
                Some(error) => masked.with_playback_error(Some(error)),
                None => masked,
            }
        } else if reset {
            masked
        } else {
            return stopped;
        };

        let window_start_us = self.masker.current_position_us(&masked);
        self.update_playback_info(
            masked,
            Transition::user_request().with_discontinuity_if(
                emptied,
                DiscontinuityReason::Remove,
                window_start_us,
            ),
        );
        stopped
    }

    /// Release the engine and every listener
    ///
    /// The player is unusable afterwards. An engine that does not release in
    /// time is reported to listeners as a timeout error.
    pub fn release(&mut self) -> Result<()> {
        self.guard.verify()?;
        if self.released {
            return Ok(());
        }

        if !self.engine.release(self.config.release_timeout()) {
            tracing::error!("Releasing the execution engine timed out");
            let error = PlayerError::timeout(TimeoutOperation::Release);
            self.batcher.queue(PlayerEvent::PlayerError { error });
            self.flush_events();
        }
        self.listeners.release();
        while self.mailbox.try_recv().is_some() {}

        self.snapshot = self
            .snapshot
            .clone()
            .with_masked_playback_state(PlaybackState::Idle)
            .with_loading_stopped();
        self.released = true;
        tracing::info!("Playback manager released");
        Ok(())
    }

    // ===== Seek =====

    /// Seek to a position in an item; `None` uses the item's default position
    ///
    /// Seeking past the end of a known playlist is an error. Seeks into an
    /// empty playlist are remembered and applied once items arrive.
    pub fn seek_to(&mut self, media_item_index: usize, position_ms: Option<i64>) -> Result<()> {
        self.verify_command()?;
        let timeline = Arc::clone(&self.snapshot.timeline);
        if !timeline.is_empty() && media_item_index >= timeline.window_count() {
            return Err(PlaybackError::IllegalSeekPosition {
                window_index: media_item_index,
                window_count: timeline.window_count(),
                position_ms,
            });
        }

        if self.is_playing_ad() {
            tracing::warn!("Seek ignored because an ad is playing");
            self.ledger.record();
            let update = PlaybackInfoUpdate::new(self.snapshot.clone()).acknowledging(1);
            if !self.self_updates.post(update) {
                tracing::warn!("Could not confirm ignored seek");
            }
            return Ok(());
        }

        let state = if self.snapshot.playback_state == PlaybackState::Idle {
            PlaybackState::Idle
        } else {
            PlaybackState::Buffering
        };
        tracing::debug!(media_item_index, ?position_ms, "Seeking");
        self.engine.submit(EngineCommand::SeekTo {
            timeline: Arc::clone(&timeline),
            window_index: Some(media_item_index),
            position_us: position_ms.map(ms_to_us),
        })?;
        self.ledger.record();

        let old_masking_index = self.get_current_media_item_index();
        let with_state = self.snapshot.clone().with_masked_playback_state(state);
        let position = self.masker.mask_window_position(
            &timeline,
            Some(media_item_index),
            position_ms,
            self.shuffle_mode_enabled,
        );
        let masked = self
            .masker
            .mask_timeline_and_position(&with_state, Arc::clone(&timeline), position);

        let window_start_us = self.masker.current_position_us(&masked);
        let mut transition = Transition::user_request().with_discontinuity_if(
            true,
            DiscontinuityReason::Seek,
            window_start_us,
        );
        transition.seek_processed = true;
        transition.old_masking_window_index = Some(old_masking_index);
        self.update_playback_info(masked, transition);
        Ok(())
    }

    /// Seek within the current item
    pub fn seek_to_position(&mut self, position_ms: i64) -> Result<()> {
        self.seek_to(self.get_current_media_item_index(), Some(position_ms))
    }

    pub fn seek_to_default_position(&mut self) -> Result<()> {
        self.seek_to(self.get_current_media_item_index(), None)
    }

    /// Seek to the next item in play order, if any
    pub fn seek_to_next_media_item(&mut self) -> Result<()> {
        match self.get_next_media_item_index() {
            Some(index) => self.seek_to(index, None),
            None => Ok(()),
        }
    }

    /// Seek to the previous item in play order, if any
    pub fn seek_to_previous_media_item(&mut self) -> Result<()> {
        match self.get_previous_media_item_index() {
            Some(index) => self.seek_to(index, None),
            None => Ok(()),
        }
    }

    /// Go to the previous item, or restart the current one
    ///
    /// Restarts the current item once playback is further in than the
    /// configured threshold, or when there is no previous item.
    pub fn seek_to_previous(&mut self) -> Result<()> {
        if self.snapshot.timeline.is_empty() || self.is_playing_ad() {
            return Ok(());
        }
        let has_previous = self.get_previous_media_item_index().is_some();
        let (live, seekable) = self
            .current_window()
            .map_or((false, false), |w| (w.is_live, w.is_seekable));
        if live && !seekable {
            if has_previous {
                self.seek_to_previous_media_item()?;
            }
            Ok(())
        } else if has_previous
            && self.get_current_position_ms() <= self.config.max_seek_to_previous_position_ms as i64
        {
            self.seek_to_previous_media_item()
        } else {
            self.seek_to_position(0)
        }
    }

    /// Go to the next item, or to the live edge of a live item
    pub fn seek_to_next(&mut self) -> Result<()> {
        if self.snapshot.timeline.is_empty() || self.is_playing_ad() {
            return Ok(());
        }
        if self.get_next_media_item_index().is_some() {
            return self.seek_to_next_media_item();
        }
        let live_dynamic = self
            .current_window()
            .is_some_and(|w| w.is_live && w.is_dynamic);
        if live_dynamic {
            self.seek_to_default_position()?;
        }
        Ok(())
    }

    pub fn seek_back(&mut self) -> Result<()> {
        self.seek_to_offset(-(self.config.seek_back_increment_ms as i64))
    }

    pub fn seek_forward(&mut self) -> Result<()> {
        self.seek_to_offset(self.config.seek_forward_increment_ms as i64)
    }

    fn seek_to_offset(&mut self, offset_ms: i64) -> Result<()> {
        let mut position_ms = self.get_current_position_ms() + offset_ms;
        if let Some(duration_ms) = self.get_duration_ms() {
            position_ms = position_ms.min(duration_ms);
        }
        self.seek_to_position(position_ms.max(0))
    }

    // ===== Audio & Video =====

    /// Set the audio volume, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.verify_command()?;
        let volume = volume.clamp(0.0, 1.0);
        if (self.volume - volume).abs() < f32::EPSILON {
            return Ok(());
        }
        self.send_to_renderers(TrackType::Audio, &MessagePayload::Volume(volume))?;
        self.volume = volume;
        self.batcher.queue(PlayerEvent::VolumeChanged { volume });
        self.flush_events();
        Ok(())
    }

    pub fn set_audio_session_id(&mut self, audio_session_id: u32) -> Result<()> {
        self.verify_command()?;
        if self.audio_session_id == audio_session_id {
            return Ok(());
        }
        let payload = MessagePayload::AudioSessionId(audio_session_id);
        self.send_to_renderers(TrackType::Audio, &payload)?;
        self.send_to_renderers(TrackType::Video, &payload)?;
        self.audio_session_id = audio_session_id;
        self.batcher
            .queue(PlayerEvent::AudioSessionIdChanged { audio_session_id });
        self.flush_events();
        Ok(())
    }

    pub fn set_skip_silence_enabled(&mut self, enabled: bool) -> Result<()> {
        self.verify_command()?;
        if self.skip_silence_enabled == enabled {
            return Ok(());
        }
        self.send_to_renderers(TrackType::Audio, &MessagePayload::SkipSilenceEnabled(enabled))?;
        self.skip_silence_enabled = enabled;
        self.batcher
            .queue(PlayerEvent::SkipSilenceEnabledChanged { enabled });
        self.flush_events();
        Ok(())
    }

    pub fn set_video_scaling_mode(&mut self, mode: VideoScalingMode) -> Result<()> {
        self.verify_command()?;
        self.send_to_renderers(TrackType::Video, &MessagePayload::VideoScalingMode(mode))?;
        self.video_scaling_mode = mode;
        Ok(())
    }

    /// Attach a video output, replacing the current one
    ///
    /// Replacing an attached output blocks until every video renderer has
    /// let go of it. If that takes longer than the detach timeout the player
    /// stops with a timeout error.
    pub fn set_video_output(&mut self, output: Option<VideoOutput>) -> Result<()> {
        self.verify_command()?;
        let receipts =
            self.send_to_renderers(TrackType::Video, &MessagePayload::VideoOutput(output.clone()))?;

        let replacing = self.video_output.is_some() && self.video_output != output;
        let timed_out = replacing && {
            let timeout = self.config.detach_output_timeout();
            !receipts.iter().all(|r| r.block_until_delivered(timeout))
        };
        self.video_output = output;

        if timed_out {
            tracing::error!("Detaching the video output timed out");
            self.stop_internal(false, Some(PlayerError::timeout(TimeoutOperation::DetachOutput)))?;
        }
        Ok(())
    }

    pub fn clear_video_output(&mut self) -> Result<()> {
        self.set_video_output(None)
    }

    fn send_to_renderers(
        &mut self,
        track_type: TrackType,
        payload: &MessagePayload,
    ) -> Result<Vec<DeliveryReceipt>> {
        let mut receipts = Vec::new();
        for target in self.renderers.indices_of(track_type) {
            let (message, receipt) = PlayerMessage::new(target, payload.clone());
            self.engine.submit(EngineCommand::SendMessage(message))?;
            receipts.push(receipt);
        }
        Ok(receipts)
    }

    // ===== Engine Confirmations =====

    /// Apply every confirmation waiting in the mailbox, in arrival order
    ///
    /// Returns the number of confirmations processed.
    pub fn process_pending_updates(&mut self) -> Result<usize> {
        self.guard.verify()?;
        let mut processed = 0;
        while let Some(update) = self.mailbox.try_recv() {
            self.handle_playback_info_update(update);
            processed += 1;
        }
        Ok(processed)
    }

    /// Wait up to `timeout` for a confirmation, then process everything
    /// waiting
    pub fn poll_updates(&mut self, timeout: Duration) -> Result<usize> {
        self.guard.verify()?;
        let Some(first) = self.mailbox.recv_timeout(timeout) else {
            return Ok(0);
        };
        self.handle_playback_info_update(first);
        Ok(1 + self.process_pending_updates()?)
    }

    fn handle_playback_info_update(&mut self, update: PlaybackInfoUpdate) {
        if self.released {
            return;
        }
        let Some(settlement) = self.ledger.acknowledge(
            update.operation_acks,
            update.discontinuity,
            update.play_when_ready_change_reason,
        ) else {
            tracing::debug!(
                pending = self.ledger.pending(),
                "Absorbed confirmation superseded by newer commands"
            );
            return;
        };

        let mut confirmed = update.snapshot;
        if !self.snapshot.timeline.is_empty() && confirmed.timeline.is_empty() {
            self.masker.clear();
        }
        if !confirmed.timeline.is_empty() && !self.playlist.refresh_from(&confirmed.timeline) {
            tracing::warn!(
                children = confirmed.timeline.child_count(),
                holders = self.playlist.len(),
                "Confirmed timeline does not match the playlist"
            );
        }
        confirmed.tracks = self.annotate_tracks(confirmed.tracks);

        let mut discontinuity = None;
        if let Some(reason) = settlement.discontinuity {
            let moved = confirmed.period_id != self.snapshot.period_id
                || confirmed.discontinuity_start_position_us != self.snapshot.position_us;
            if moved {
                let start_us = confirmed.discontinuity_start_position_us;
                let window_start_us =
                    if confirmed.timeline.is_empty() || confirmed.period_id.is_ad() {
                        start_us
                    } else {
                        confirmed.window_position_us(start_us)
                    };
                discontinuity = Some((reason, window_start_us));
            }
        }

        tracing::debug!(
            state = ?confirmed.playback_state,
            discontinuity = ?discontinuity.map(|(reason, _)| reason),
            "Accepted engine confirmation"
        );
        self.update_playback_info(
            confirmed,
            Transition {
                timeline_change_reason: TimelineChangeReason::SourceUpdate,
                play_when_ready_change_reason: settlement.play_when_ready_change_reason,
                seek_processed: false,
                discontinuity,
                old_masking_window_index: None,
            },
        );
    }

    fn annotate_tracks(&self, mut tracks: Tracks) -> Tracks {
        for group in &mut tracks.groups {
            group.support = group
                .formats
                .iter()
                .map(|format| self.renderers.supports_format(group.track_type, format))
                .collect();
        }
        tracks
    }

    // ===== Notification =====

    fn update_playback_info(&mut self, new: PlaybackSnapshot, transition: Transition) {
        let previous = std::mem::replace(&mut self.snapshot, new);
        let current = &self.snapshot;

        let timeline_changed = !Arc::ptr_eq(&previous.timeline, &current.timeline)
            && *previous.timeline != *current.timeline;
        let media_item_transition = classify_media_item_transition(
            &previous,
            current,
            transition.discontinuity.map(|(reason, _)| reason),
            timeline_changed,
        );

        let mut new_media_metadata = self.media_metadata.clone();
        let mut media_item = None;
        if media_item_transition.is_some() {
            media_item = self.current_window().map(|w| w.media_item.clone());
            self.static_and_dynamic_metadata = MediaMetadata::EMPTY;
        }
        let static_metadata_changed = previous.static_metadata != self.snapshot.static_metadata;
        if media_item_transition.is_some() || static_metadata_changed {
            let mut metadata = std::mem::take(&mut self.static_and_dynamic_metadata);
            for entry in &self.snapshot.static_metadata {
                metadata = entry.clone().populate_from(&metadata);
            }
            self.static_and_dynamic_metadata = metadata;
            new_media_metadata = self.build_media_metadata();
        }
        let metadata_changed = new_media_metadata != self.media_metadata;
        self.media_metadata = new_media_metadata;

        let current = &self.snapshot;
        if timeline_changed {
            self.batcher.queue(PlayerEvent::TimelineChanged {
                timeline: Arc::clone(&current.timeline),
                reason: transition.timeline_change_reason,
            });
        }
        if let Some((reason, window_start_us)) = transition.discontinuity {
            let old_position = previous_position_info(
                reason,
                &previous,
                current,
                transition.old_masking_window_index.unwrap_or(0),
            );
            let media_item_index = self.masker.current_window_index(current).unwrap_or(0);
            let new_position = current_position_info(current, media_item_index, window_start_us);
            self.batcher.queue(PlayerEvent::PositionDiscontinuity {
                old_position,
                new_position,
                reason,
            });
        }
        if let Some(reason) = media_item_transition {
            self.batcher
                .queue(PlayerEvent::MediaItemTransition { media_item, reason });
        }
        if previous.playback_error != current.playback_error {
            self.batcher.queue(PlayerEvent::PlayerErrorChanged {
                error: current.playback_error.clone(),
            });
            if let Some(error) = &current.playback_error {
                self.batcher
                    .queue(PlayerEvent::PlayerError { error: error.clone() });
            }
        }
        if previous.tracks != current.tracks {
            self.batcher.queue(PlayerEvent::TracksChanged {
                tracks: current.tracks.clone(),
            });
        }
        if metadata_changed {
            self.batcher.queue(PlayerEvent::MediaMetadataChanged {
                metadata: self.media_metadata.clone(),
            });
        }
        if previous.is_loading != current.is_loading {
            self.batcher.queue(PlayerEvent::IsLoadingChanged {
                is_loading: current.is_loading,
            });
        }
        let state_changed = previous.playback_state != current.playback_state;
        let play_when_ready_changed = previous.play_when_ready != current.play_when_ready;
        if state_changed || play_when_ready_changed {
            self.batcher.queue(PlayerEvent::PlayerStateChanged {
                play_when_ready: current.play_when_ready,
                playback_state: current.playback_state,
            });
        }
        if state_changed {
            self.batcher.queue(PlayerEvent::PlaybackStateChanged {
                playback_state: current.playback_state,
            });
        }
        if play_when_ready_changed {
            self.batcher.queue(PlayerEvent::PlayWhenReadyChanged {
                play_when_ready: current.play_when_ready,
                reason: transition.play_when_ready_change_reason,
            });
        }
        if previous.suppression_reason != current.suppression_reason {
            self.batcher.queue(PlayerEvent::PlaybackSuppressionReasonChanged {
                reason: current.suppression_reason,
            });
        }
        if previous.is_playing() != current.is_playing() {
            self.batcher.queue(PlayerEvent::IsPlayingChanged {
                is_playing: current.is_playing(),
            });
        }
        if previous.playback_parameters != current.playback_parameters {
            self.batcher.queue(PlayerEvent::PlaybackParametersChanged {
                parameters: current.playback_parameters,
            });
        }
        if transition.seek_processed {
            self.batcher.queue(PlayerEvent::SeekProcessed);
        }
        self.update_available_commands();
        self.flush_events();

        let current = &self.snapshot;
        if previous.offload_scheduling_enabled != current.offload_scheduling_enabled {
            self.listeners
                .dispatch_offload_scheduling_enabled(current.offload_scheduling_enabled);
        }
        if previous.sleeping_for_offload != current.sleeping_for_offload {
            self.listeners
                .dispatch_sleeping_for_offload(current.sleeping_for_offload);
        }
    }

    fn build_media_metadata(&self) -> MediaMetadata {
        match self.get_current_media_item() {
            Some(item) => self
                .static_and_dynamic_metadata
                .clone()
                .populate_from(&item.metadata),
            None => self.static_and_dynamic_metadata.clone(),
        }
    }

    fn update_available_commands(&mut self) {
        let window = self.current_window();
        let context = CommandContext {
            is_playing_ad: self.is_playing_ad(),
            is_current_item_seekable: window.is_some_and(|w| w.is_seekable),
            has_previous_item: self.get_previous_media_item_index().is_some(),
            has_next_item: self.get_next_media_item_index().is_some(),
            is_current_item_live: window.is_some_and(|w| w.is_live),
            is_current_item_dynamic: window.is_some_and(|w| w.is_dynamic),
            is_timeline_empty: self.snapshot.timeline.is_empty(),
        };
        let available = Commands::available(&self.permanent_commands, &context);
        if available != self.available_commands {
            self.available_commands = available.clone();
            self.batcher.queue(PlayerEvent::AvailableCommandsChanged {
                commands: available,
            });
        }
    }

    fn flush_events(&mut self) {
        let (events, flags) = self.batcher.take();
        self.listeners.dispatch(&events, flags);
    }

    // ===== Engine Plumbing =====

    fn verify_command(&self) -> Result<()> {
        self.guard.verify()?;
        if self.released {
            return Err(PlaybackError::Released);
        }
        Ok(())
    }

    /// Getters report wrong-thread access but still answer
    fn verify_read(&self) {
        if let Err(e) = self.guard.verify() {
            tracing::error!(error = %e, "Player state read on the wrong thread");
        }
    }

    /// Forward a command; the ledger only counts commands the engine took
    fn submit(&mut self, command: EngineCommand) -> Result<()> {
        let acknowledges = command.acknowledges();
        tracing::debug!(?command, pending = self.ledger.pending(), "Forwarding to engine");
        self.engine.submit(command)?;
        if acknowledges {
            self.ledger.record();
        }
        Ok(())
    }

    fn current_window(&self) -> Option<&soul_timeline::Window> {
        self.snapshot
            .window_index()
            .and_then(|index| self.snapshot.timeline.window(index))
    }

    fn navigation_repeat_mode(&self) -> RepeatMode {
        match self.repeat_mode {
            RepeatMode::One => RepeatMode::Off,
            mode => mode,
        }
    }

    // ===== State Queries =====

    /// Current snapshot, masked predictions included
    pub fn snapshot(&self) -> &PlaybackSnapshot {
        self.verify_read();
        &self.snapshot
    }

    pub fn get_playback_state(&self) -> PlaybackState {
        self.verify_read();
        self.snapshot.playback_state
    }

    pub fn get_play_when_ready(&self) -> bool {
        self.verify_read();
        self.snapshot.play_when_ready
    }

    pub fn get_playback_suppression_reason(&self) -> SuppressionReason {
        self.verify_read();
        self.snapshot.suppression_reason
    }

    /// Ready, playing and not suppressed
    pub fn is_playing(&self) -> bool {
        self.verify_read();
        self.snapshot.is_playing()
    }

    pub fn is_loading(&self) -> bool {
        self.verify_read();
        self.snapshot.is_loading
    }

    pub fn get_player_error(&self) -> Option<&PlayerError> {
        self.verify_read();
        self.snapshot.playback_error.as_ref()
    }

    pub fn get_playback_parameters(&self) -> PlaybackParameters {
        self.verify_read();
        self.snapshot.playback_parameters
    }

    pub fn get_repeat_mode(&self) -> RepeatMode {
        self.verify_read();
        self.repeat_mode
    }

    pub fn get_shuffle_mode_enabled(&self) -> bool {
        self.verify_read();
        self.shuffle_mode_enabled
    }

    pub fn get_pause_at_end_of_media_items(&self) -> bool {
        self.verify_read();
        self.pause_at_end_of_media_items
    }

    pub fn get_current_timeline(&self) -> Arc<Timeline> {
        self.verify_read();
        Arc::clone(&self.snapshot.timeline)
    }

    pub fn get_media_item_count(&self) -> usize {
        self.verify_read();
        self.snapshot.timeline.window_count()
    }

    /// Index of the current item, 0 while nothing is known
    pub fn get_current_media_item_index(&self) -> usize {
        self.verify_read();
        self.masker.current_window_index(&self.snapshot).unwrap_or(0)
    }

    pub fn get_current_period_index(&self) -> usize {
        self.verify_read();
        self.masker.current_period_index(&self.snapshot)
    }

    pub fn get_current_media_item(&self) -> Option<&MediaItem> {
        self.verify_read();
        self.current_window().map(|w| &w.media_item)
    }

    /// Next item in play order; repeat-one counts as off
    pub fn get_next_media_item_index(&self) -> Option<usize> {
        self.verify_read();
        if self.snapshot.timeline.is_empty() {
            return None;
        }
        self.snapshot.timeline.next_window_index(
            self.get_current_media_item_index(),
            self.navigation_repeat_mode(),
            self.shuffle_mode_enabled,
        )
    }

    /// Previous item in play order; repeat-one counts as off
    pub fn get_previous_media_item_index(&self) -> Option<usize> {
        self.verify_read();
        if self.snapshot.timeline.is_empty() {
            return None;
        }
        self.snapshot.timeline.previous_window_index(
            self.get_current_media_item_index(),
            self.navigation_repeat_mode(),
            self.shuffle_mode_enabled,
        )
    }

    /// Playback position in the current item, or in the playing ad
    pub fn get_current_position_ms(&self) -> i64 {
        self.verify_read();
        us_to_ms(self.masker.current_position_us(&self.snapshot))
    }

    /// Position in the current item's content; during an ad, where the
    /// content resumes
    pub fn get_content_position_ms(&self) -> i64 {
        self.verify_read();
        self.masker.content_position_ms(&self.snapshot)
    }

    /// Duration of the current item, or of the playing ad
    pub fn get_duration_ms(&self) -> Option<i64> {
        self.verify_read();
        if self.is_playing_ad() {
            let period_id = self.snapshot.period_id;
            let period = self.snapshot.timeline.period_by_uid(&period_id.period_uid)?;
            let group = period_id.ad_group_index?;
            let ad = period_id.ad_index_in_ad_group?;
            return period.ad_duration_us(group, ad).map(us_to_ms);
        }
        self.current_window().and_then(|w| w.duration_ms())
    }

    pub fn get_buffered_position_ms(&self) -> i64 {
        self.verify_read();
        if self.is_playing_ad() {
            return if self.snapshot.loading_period_id == self.snapshot.period_id {
                us_to_ms(self.snapshot.buffered_position_us)
            } else {
                self.get_duration_ms()
                    .unwrap_or_else(|| self.get_current_position_ms())
            };
        }
        self.get_content_buffered_position_ms()
    }

    /// Buffered position in the current item's content
    pub fn get_content_buffered_position_ms(&self) -> i64 {
        self.verify_read();
        let snapshot = &self.snapshot;
        if snapshot.timeline.is_empty() {
            return self.masker.position().window_position_ms;
        }
        let loading = snapshot.loading_period_id;
        if loading.window_sequence_number != snapshot.period_id.window_sequence_number {
            return self
                .current_window()
                .and_then(|w| w.duration_ms())
                .unwrap_or_else(|| self.get_current_position_ms());
        }

        let loading_period = snapshot.timeline.period_by_uid(&loading.period_uid);
        let mut buffered_us = snapshot.buffered_position_us;
        if let Some(group) = loading.ad_group_index {
            if let Some(cue_us) = loading_period.and_then(|p| p.ad_group_time_us(group)) {
                buffered_us = cue_us;
            }
        }
        let offset_us = loading_period.map_or(0, |p| p.position_in_window_us);
        us_to_ms(buffered_us + offset_us)
    }

    pub fn get_total_buffered_duration_ms(&self) -> i64 {
        self.verify_read();
        us_to_ms(self.snapshot.total_buffered_duration_us)
    }

    pub fn is_playing_ad(&self) -> bool {
        self.snapshot.period_id.is_ad()
    }

    pub fn get_current_ad_group_index(&self) -> Option<usize> {
        self.verify_read();
        self.snapshot.period_id.ad_group_index
    }

    pub fn get_current_ad_index_in_ad_group(&self) -> Option<usize> {
        self.verify_read();
        self.snapshot.period_id.ad_index_in_ad_group
    }

    pub fn get_current_period_id(&self) -> PeriodId {
        self.verify_read();
        self.snapshot.period_id
    }

    pub fn get_current_tracks(&self) -> &Tracks {
        self.verify_read();
        &self.snapshot.tracks
    }

    /// Current item metadata overlaid with metadata found in the stream
    pub fn get_media_metadata(&self) -> &MediaMetadata {
        self.verify_read();
        &self.media_metadata
    }

    pub fn get_playlist_metadata(&self) -> &MediaMetadata {
        self.verify_read();
        &self.playlist_metadata
    }

    pub fn get_available_commands(&self) -> &Commands {
        self.verify_read();
        &self.available_commands
    }

    pub fn is_command_available(&self, command: Command) -> bool {
        self.verify_read();
        self.available_commands.contains(command)
    }

    pub fn get_volume(&self) -> f32 {
        self.verify_read();
        self.volume
    }

    pub fn get_audio_session_id(&self) -> u32 {
        self.verify_read();
        self.audio_session_id
    }

    pub fn get_skip_silence_enabled(&self) -> bool {
        self.verify_read();
        self.skip_silence_enabled
    }

    pub fn get_video_scaling_mode(&self) -> VideoScalingMode {
        self.verify_read();
        self.video_scaling_mode
    }

    pub fn get_video_output(&self) -> Option<&VideoOutput> {
        self.verify_read();
        self.video_output.as_ref()
    }

    /// Commands forwarded to the engine and not yet confirmed
    pub fn pending_operation_count(&self) -> usize {
        self.ledger.pending()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }
}

impl std::fmt::Debug for PlaybackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackManager")
            .field("playback_state", &self.snapshot.playback_state)
            .field("media_items", &self.playlist.len())
            .field("pending_operations", &self.ledger.pending())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
