//! Simulated execution engine
//!
//! Plays a concatenation of single-window sources in real time without
//! decoding anything. Sources become READY as soon as they are prepared.

use soul_playback::{
    DiscontinuityReason, EngineCommand, EngineOutput, PeriodId, PlayWhenReadyChangeReason,
    PlaybackBackend, PlaybackSnapshot, PlaybackState, SourceSnapshot,
};
use soul_timeline::{RepeatMode, ShuffleOrder, Timeline};
use std::sync::Arc;
use std::time::Duration;

pub struct SimulatedBackend {
    sources: Vec<SourceSnapshot>,
    shuffle_order: ShuffleOrder,
    repeat_mode: RepeatMode,
    shuffle_mode_enabled: bool,
    pause_at_end_of_window: bool,
    snapshot: PlaybackSnapshot,
    tick_us: i64,
    next_sequence: u64,
}

impl SimulatedBackend {
    pub fn new(tick: Duration) -> Self {
        Self {
            sources: Vec::new(),
            shuffle_order: ShuffleOrder::unshuffled(0),
            repeat_mode: RepeatMode::Off,
            shuffle_mode_enabled: false,
            pause_at_end_of_window: false,
            snapshot: PlaybackSnapshot::initial(),
            tick_us: i64::try_from(tick.as_micros()).unwrap_or(i64::MAX),
            next_sequence: 0,
        }
    }

    // ===== Timeline =====

    fn rebuild_timeline(&mut self) {
        let children = self
            .sources
            .iter()
            .map(|source| {
                let duration_us = source
                    .media_item
                    .duration
                    .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX));
                (
                    source.uid,
                    Arc::new(Timeline::single(source.media_item.clone(), duration_us, true)),
                )
            })
            .collect();

        let timeline = match Timeline::concatenate(children, self.shuffle_order.clone()) {
            Ok(timeline) => timeline,
            Err(e) => {
                tracing::warn!("Discarding inconsistent playlist: {}", e);
                self.sources.clear();
                self.shuffle_order = ShuffleOrder::unshuffled(0);
                Timeline::empty()
            }
        };
        self.snapshot.timeline = Arc::new(timeline);
    }

    /// Keep the playing period if it survived the edit, else restart at `fallback`
    fn follow_playing_period(&mut self, fallback: usize) {
        let timeline = Arc::clone(&self.snapshot.timeline);
        if timeline.is_empty() {
            self.snapshot.period_id = PeriodId::dummy();
            self.snapshot.loading_period_id = PeriodId::dummy();
            self.snapshot.position_us = 0;
            if self.snapshot.playback_state != PlaybackState::Idle {
                self.snapshot.playback_state = PlaybackState::Ended;
            }
            return;
        }
        if timeline
            .index_of_period(&self.snapshot.period_id.period_uid)
            .is_some()
        {
            return;
        }
        let window = fallback.min(timeline.window_count() - 1);
        self.move_to(window, Some(0));
    }

    fn move_to(&mut self, window_index: usize, position_us: Option<i64>) {
        let Ok((period_uid, position_us)) = self
            .snapshot
            .timeline
            .period_position_us(window_index, position_us)
        else {
            tracing::warn!(window_index, "Seek outside the simulated timeline");
            return;
        };

        let period_id = PeriodId::with_sequence(period_uid, self.next_sequence);
        self.next_sequence += 1;
        self.snapshot = self
            .snapshot
            .clone()
            .with_new_position(period_id, position_us, Some(position_us), position_us, 0)
            .with_loading_period_id(period_id)
            .with_buffered_position_us(position_us);
        if self.snapshot.playback_state == PlaybackState::Ended {
            self.snapshot.playback_state = PlaybackState::Ready;
        }
    }

    fn output(&self) -> EngineOutput {
        EngineOutput::new(self.snapshot.clone())
    }
}

impl PlaybackBackend for SimulatedBackend {
    fn apply(&mut self, command: EngineCommand) -> EngineOutput {
        match command {
            EngineCommand::Prepare => {
                self.snapshot.playback_error = None;
                self.snapshot.playback_state = if self.snapshot.timeline.is_empty() {
                    PlaybackState::Ended
                } else {
                    PlaybackState::Ready
                };
                self.output()
            }
            EngineCommand::SetMediaSources {
                sources,
                start_window_index,
                start_position_us,
                shuffle_order,
            } => {
                self.sources = sources;
                self.shuffle_order = shuffle_order;
                self.rebuild_timeline();
                self.snapshot.period_id = PeriodId::dummy();
                let first = self
                    .snapshot
                    .timeline
                    .first_window_index(self.shuffle_mode_enabled);
                match start_window_index.or(first) {
                    Some(window) => self.move_to(window, start_position_us),
                    None => self.follow_playing_period(0),
                }
                self.output()
            }
            EngineCommand::AddMediaSources {
                index,
                sources,
                shuffle_order,
            } => {
                let index = index.min(self.sources.len());
                let tail = self.sources.split_off(index);
                self.sources.extend(sources);
                self.sources.extend(tail);
                self.shuffle_order = shuffle_order;
                self.rebuild_timeline();
                self.follow_playing_period(0);
                self.output()
            }
            EngineCommand::RemoveMediaSources {
                from,
                to,
                shuffle_order,
            } => {
                let to = to.min(self.sources.len());
                let from = from.min(to);
                self.sources.drain(from..to);
                self.shuffle_order = shuffle_order;
                self.rebuild_timeline();
                self.follow_playing_period(from);
                self.output()
            }
            EngineCommand::MoveMediaSources {
                from,
                to,
                new_from,
                shuffle_order,
            } => {
                let to = to.min(self.sources.len());
                let from = from.min(to);
                let moved: Vec<_> = self.sources.drain(from..to).collect();
                let new_from = new_from.min(self.sources.len());
                let tail = self.sources.split_off(new_from);
                self.sources.extend(moved);
                self.sources.extend(tail);
                self.shuffle_order = shuffle_order;
                self.rebuild_timeline();
                self.follow_playing_period(0);
                self.output()
            }
            EngineCommand::SetShuffleOrder(shuffle_order) => {
                self.shuffle_order = shuffle_order;
                self.rebuild_timeline();
                self.output()
            }
            EngineCommand::SeekTo {
                timeline: _,
                window_index,
                position_us,
            } => {
                let first = self
                    .snapshot
                    .timeline
                    .first_window_index(self.shuffle_mode_enabled);
                if let Some(window) = window_index.or(first) {
                    self.move_to(window, position_us);
                }
                self.output().with_discontinuity(DiscontinuityReason::Seek)
            }
            EngineCommand::SetPlayWhenReady {
                play_when_ready,
                suppression_reason,
            } => {
                self.snapshot = self.snapshot.clone().with_play_when_ready(
                    play_when_ready,
                    PlayWhenReadyChangeReason::UserRequest,
                    suppression_reason,
                );
                self.output()
            }
            EngineCommand::SetPlaybackParameters(parameters) => {
                self.snapshot.playback_parameters = parameters;
                self.output()
            }
            EngineCommand::SetRepeatMode(repeat_mode) => {
                self.repeat_mode = repeat_mode;
                self.output()
            }
            EngineCommand::SetShuffleModeEnabled(enabled) => {
                self.shuffle_mode_enabled = enabled;
                self.output()
            }
            EngineCommand::SetPauseAtEndOfWindow(enabled) => {
                self.pause_at_end_of_window = enabled;
                self.output()
            }
            EngineCommand::SetOffloadSchedulingEnabled(enabled) => {
                self.snapshot.offload_scheduling_enabled = enabled;
                self.output()
            }
            EngineCommand::Stop => {
                self.snapshot = self
                    .snapshot
                    .clone()
                    .with_playback_state(PlaybackState::Idle)
                    .with_loading_stopped();
                self.output()
            }
            // Delivered by the engine thread, never handed to the backend
            EngineCommand::SendMessage(_) => self.output(),
        }
    }

    fn poll(&mut self) -> Option<EngineOutput> {
        if !self.snapshot.is_playing() {
            return None;
        }

        let advance = (self.tick_us as f32 * self.snapshot.playback_parameters.speed) as i64;
        self.snapshot.position_us += advance;
        self.snapshot.buffered_position_us = self.snapshot.position_us;

        let window_index = self.snapshot.window_index()?;
        let duration_us = self
            .snapshot
            .timeline
            .window(window_index)
            .and_then(|w| w.duration_us);
        let Some(duration_us) = duration_us else {
            return Some(self.output());
        };
        if self.snapshot.position_us < duration_us {
            return Some(self.output());
        }

        if self.pause_at_end_of_window {
            self.snapshot.position_us = duration_us;
            self.snapshot = self.snapshot.clone().with_play_when_ready(
                false,
                PlayWhenReadyChangeReason::EndOfMediaItem,
                self.snapshot.suppression_reason,
            );
            return Some(
                self.output()
                    .with_play_when_ready_change_reason(PlayWhenReadyChangeReason::EndOfMediaItem),
            );
        }

        match self.snapshot.timeline.next_window_index(
            window_index,
            self.repeat_mode,
            self.shuffle_mode_enabled,
        ) {
            Some(next) => {
                self.move_to(next, Some(0));
                Some(self.output().with_discontinuity(DiscontinuityReason::AutoTransition))
            }
            None => {
                self.snapshot.position_us = duration_us;
                self.snapshot.playback_state = PlaybackState::Ended;
                tracing::debug!("Reached the end of the playlist");
                Some(self.output())
            }
        }
    }

    fn set_foreground_mode(&mut self, foreground: bool) {
        tracing::debug!(foreground, "Foreground mode switched");
    }

    fn release(&mut self) {
        tracing::debug!(sources = self.sources.len(), "Simulated backend released");
    }
}
