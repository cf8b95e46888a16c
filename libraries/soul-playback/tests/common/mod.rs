//! Shared fixtures for playback integration tests
//!
//! `FakeEngine` records every command and never confirms on its own; tests
//! decide what the engine "did" by posting updates through [`EngineHandle`].

#![allow(dead_code)]

use soul_playback::{
    EngineCommand, EngineContext, EventFlags, ExecutionEngine, Format, FormatSupport, MailboxSender,
    MediaItem, MessagePayload, PeriodId, PlaybackConfig, PlaybackError, PlaybackInfoUpdate,
    PlaybackManager, PlaybackSnapshot, PlaybackState, PlayerEvent, PlayerListener, Renderer, Result, TrackType,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// FAKE ENGINE
// ============================================================================

#[derive(Default)]
struct EngineState {
    commands: Vec<EngineCommand>,
    stall_messages: bool,
    disconnected: bool,
    foreground_fails: bool,
    release_fails: bool,
}

/// Test-side handle on the fake engine
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<Mutex<EngineState>>,
    updates: Arc<Mutex<Option<MailboxSender>>>,
}

impl EngineHandle {
    /// Names of the commands received so far, e.g. `"Prepare"`
    pub fn command_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .commands
            .iter()
            .map(command_name)
            .collect()
    }

    pub fn take_commands(&self) -> Vec<EngineCommand> {
        std::mem::take(&mut self.state.lock().unwrap().commands)
    }

    pub fn clear(&self) {
        self.state.lock().unwrap().commands.clear();
    }

    /// Renderer messages stop being delivered
    pub fn stall_messages(&self) {
        self.state.lock().unwrap().stall_messages = true;
    }

    /// Every later command is rejected as if the engine thread had died
    pub fn disconnect(&self) {
        self.state.lock().unwrap().disconnected = true;
    }

    pub fn fail_foreground_mode(&self) {
        self.state.lock().unwrap().foreground_fails = true;
    }

    pub fn fail_release(&self) {
        self.state.lock().unwrap().release_fails = true;
    }

    pub fn post(&self, update: PlaybackInfoUpdate) {
        let updates = self.updates.lock().unwrap();
        assert!(updates.as_ref().unwrap().post(update));
    }

    /// Confirm `acks` commands with `snapshot`
    pub fn confirm(&self, snapshot: PlaybackSnapshot, acks: usize) {
        self.post(PlaybackInfoUpdate::new(snapshot).acknowledging(acks));
    }
}

pub struct FakeEngine {
    handle: EngineHandle,
}

impl ExecutionEngine for FakeEngine {
    fn submit(&mut self, command: EngineCommand) -> Result<()> {
        let mut state = self.handle.state.lock().unwrap();
        if state.disconnected {
            return Err(PlaybackError::EngineDisconnected);
        }
        if let EngineCommand::SendMessage(message) = &command {
            if !state.stall_messages {
                message.mark_delivered();
            }
        }
        state.commands.push(command);
        Ok(())
    }

    fn set_foreground_mode(&mut self, _foreground: bool, _timeout: Option<Duration>) -> bool {
        !self.handle.state.lock().unwrap().foreground_fails
    }

    fn release(&mut self, _timeout: Duration) -> bool {
        !self.handle.state.lock().unwrap().release_fails
    }
}

pub fn command_name(command: &EngineCommand) -> String {
    let debug = format!("{command:?}");
    debug
        .split([' ', '(', '{'])
        .next()
        .unwrap_or_default()
        .to_string()
}

// ============================================================================
// RECORDING LISTENER
// ============================================================================

/// Every batch a listener received, in order
#[derive(Clone, Default)]
pub struct EventLog {
    batches: Arc<Mutex<Vec<(Vec<PlayerEvent>, EventFlags)>>>,
    pending: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl EventLog {
    pub fn batches(&self) -> Vec<(Vec<PlayerEvent>, EventFlags)> {
        self.batches.lock().unwrap().clone()
    }

    /// Events of every batch, flattened
    pub fn events(&self) -> Vec<PlayerEvent> {
        self.batches()
            .into_iter()
            .flat_map(|(events, _)| events)
            .collect()
    }

    pub fn last_batch(&self) -> Vec<PlayerEvent> {
        self.batches()
            .pop()
            .map(|(events, _)| events)
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.batches.lock().unwrap().clear();
    }
}

struct RecordingListener {
    log: EventLog,
}

impl PlayerListener for RecordingListener {
    fn on_event(&mut self, event: &PlayerEvent) {
        self.log.pending.lock().unwrap().push(event.clone());
    }

    fn on_events(&mut self, flags: EventFlags) {
        let events = std::mem::take(&mut *self.log.pending.lock().unwrap());
        self.log.batches.lock().unwrap().push((events, flags));
    }
}

// ============================================================================
// RENDERERS
// ============================================================================

/// Renderer that records the payloads delivered to it
pub struct RecordingRenderer {
    track_type: TrackType,
    pub received: Mutex<Vec<MessagePayload>>,
    handles: Vec<&'static str>,
}

impl RecordingRenderer {
    /// `handles` lists the sample MIME types reported as handled
    pub fn new(track_type: TrackType, handles: Vec<&'static str>) -> Arc<Self> {
        Arc::new(Self {
            track_type,
            received: Mutex::new(Vec::new()),
            handles,
        })
    }
}

impl Renderer for RecordingRenderer {
    fn track_type(&self) -> TrackType {
        self.track_type
    }

    fn supports_format(&self, format: &Format) -> FormatSupport {
        if self.handles.contains(&format.sample_mime_type.as_str()) {
            FormatSupport::Handled
        } else {
            FormatSupport::UnsupportedSubtype
        }
    }

    fn handle_message(&self, payload: &MessagePayload) {
        self.received.lock().unwrap().push(payload.clone());
    }
}

// ============================================================================
// HARNESS
// ============================================================================

pub struct Harness {
    pub player: PlaybackManager,
    pub engine: EngineHandle,
    pub events: EventLog,
}

pub fn harness() -> Harness {
    harness_with(PlaybackConfig::default(), Vec::new())
}

pub fn harness_with(config: PlaybackConfig, renderers: Vec<Arc<dyn Renderer>>) -> Harness {
    let handle = EngineHandle {
        state: Arc::default(),
        updates: Arc::default(),
    };
    let engine_handle = handle.clone();

    let mut builder = PlaybackManager::builder(config);
    for renderer in renderers {
        builder = builder.renderer(renderer);
    }
    let player = builder
        .build(move |ctx: EngineContext| {
            *engine_handle.updates.lock().unwrap() = Some(ctx.updates);
            Ok(FakeEngine {
                handle: engine_handle,
            })
        })
        .unwrap();

    let events = EventLog::default();
    player.add_listener(Box::new(RecordingListener {
        log: events.clone(),
    }));

    Harness {
        player,
        engine: handle,
        events,
    }
}

pub fn item(id: &str) -> MediaItem {
    MediaItem::new(id, format!("file:///music/{id}.flac"))
}

pub fn items(ids: &[&str]) -> Vec<MediaItem> {
    ids.iter().map(|id| item(id)).collect()
}

/// Item with a known duration, so its placeholder window has one
pub fn item_with_duration(id: &str, seconds: u64) -> MediaItem {
    item(id).with_duration(Duration::from_secs(seconds))
}

/// Authoritative snapshot playing `window_index` at `position_ms`
///
/// Built on the timeline of `base`, with the window index as visit sequence
/// number.
pub fn playing_at(
    base: &PlaybackSnapshot,
    window_index: usize,
    position_ms: i64,
    state: PlaybackState,
) -> PlaybackSnapshot {
    let (period_uid, position_us) = base
        .timeline
        .period_position_us(window_index, Some(position_ms * 1000))
        .unwrap();
    let period_id = PeriodId::with_sequence(period_uid, window_index as u64);
    base.clone()
        .with_new_position(period_id, position_us, Some(position_us), position_us, 0)
        .with_loading_period_id(period_id)
        .with_buffered_position_us(position_us)
        .with_playback_state(state)
}

pub fn count<F: Fn(&PlayerEvent) -> bool>(events: &[PlayerEvent], predicate: F) -> usize {
    events.iter().filter(|e| predicate(e)).count()
}

pub fn is_state(state: PlaybackState) -> impl Fn(&PlayerEvent) -> bool {
    move |event| {
        matches!(event, PlayerEvent::PlaybackStateChanged { playback_state } if *playback_state == state)
    }
}
