//! Player listeners
//!
//! Listeners may be added and removed from any thread. Dispatch happens on
//! the caller thread only, from a snapshot of the registered listeners taken
//! before any callback runs, so a callback may add or remove listeners
//! without deadlocking.

use crate::error::PlayerError;
use crate::events::{EventFlag, EventFlags, PlayerEvent};
use crate::types::{MediaItemTransitionReason, PlaybackState, PositionInfo};
use soul_timeline::MediaItem;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives the events of each transition, in order, then the batch summary
pub trait PlayerListener: Send {
    fn on_event(&mut self, event: &PlayerEvent);

    /// Called once per batch after every event of the batch was delivered
    fn on_events(&mut self, _flags: EventFlags) {}
}

/// Receives offload scheduling changes, after the main batch
pub trait OffloadListener: Send {
    fn on_offload_scheduling_enabled_changed(&mut self, _enabled: bool) {}

    fn on_sleeping_for_offload_changed(&mut self, _sleeping: bool) {}
}

/// Handle returned when a listener is added
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type SharedListener = Arc<Mutex<Box<dyn PlayerListener>>>;
type SharedOffloadListener = Arc<Mutex<Box<dyn OffloadListener>>>;

#[derive(Default)]
struct Registered {
    next_id: u64,
    listeners: Vec<(ListenerId, SharedListener)>,
    offload_listeners: Vec<(ListenerId, SharedOffloadListener)>,
}

impl Registered {
    fn next_id(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }
}

/// Thread-safe set of listeners
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    inner: Arc<Mutex<Registered>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Registered> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add(&self, listener: Box<dyn PlayerListener>) -> ListenerId {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner.listeners.push((id, Arc::new(Mutex::new(listener))));
        id
    }

    /// Returns false if the listener was not registered
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.listeners.len();
        inner.listeners.retain(|(i, _)| *i != id);
        inner.listeners.len() != before
    }

    pub fn add_offload(&self, listener: Box<dyn OffloadListener>) -> ListenerId {
        let mut inner = self.lock();
        let id = inner.next_id();
        inner
            .offload_listeners
            .push((id, Arc::new(Mutex::new(listener))));
        id
    }

    pub fn remove_offload(&self, id: ListenerId) -> bool {
        let mut inner = self.lock();
        let before = inner.offload_listeners.len();
        inner.offload_listeners.retain(|(i, _)| *i != id);
        inner.offload_listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every listener
    pub fn release(&self) {
        let mut inner = self.lock();
        inner.listeners.clear();
        inner.offload_listeners.clear();
    }

    /// Deliver one batch to every listener
    pub fn dispatch(&self, events: &[PlayerEvent], flags: EventFlags) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<_> = self
            .lock()
            .listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in listeners {
            let mut listener = listener.lock().unwrap_or_else(PoisonError::into_inner);
            for event in events {
                listener.on_event(event);
            }
            listener.on_events(flags);
        }
    }

    pub fn dispatch_offload_scheduling_enabled(&self, enabled: bool) {
        for listener in self.offload_snapshot() {
            let mut listener = listener.lock().unwrap_or_else(PoisonError::into_inner);
            listener.on_offload_scheduling_enabled_changed(enabled);
        }
    }

    pub fn dispatch_sleeping_for_offload(&self, sleeping: bool) {
        for listener in self.offload_snapshot() {
            let mut listener = listener.lock().unwrap_or_else(PoisonError::into_inner);
            listener.on_sleeping_for_offload_changed(sleeping);
        }
    }

    fn offload_snapshot(&self) -> Vec<SharedOffloadListener> {
        self.lock()
            .offload_listeners
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("ListenerRegistry")
            .field("listeners", &inner.listeners.len())
            .field("offload_listeners", &inner.offload_listeners.len())
            .finish()
    }
}

type EventHandler = Box<dyn FnMut(&PlayerEvent) + Send>;

/// Listener built from per-category handler functions
///
/// ```
/// use soul_playback::ListenerAdapter;
///
/// let listener = ListenerAdapter::new()
///     .on_playback_state(|state| println!("state: {state:?}"))
///     .on_is_playing(|playing| println!("playing: {playing}"));
/// ```
#[derive(Default)]
pub struct ListenerAdapter {
    handlers: HashMap<EventFlag, Vec<EventHandler>>,
    untagged: Vec<EventHandler>,
}

impl ListenerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle every event of one category
    #[must_use]
    pub fn on(mut self, flag: EventFlag, handler: impl FnMut(&PlayerEvent) + Send + 'static) -> Self {
        self.handlers.entry(flag).or_default().push(Box::new(handler));
        self
    }

    /// Handle the events without a category of their own
    #[must_use]
    pub fn on_untagged(mut self, handler: impl FnMut(&PlayerEvent) + Send + 'static) -> Self {
        self.untagged.push(Box::new(handler));
        self
    }

    #[must_use]
    pub fn on_playback_state(self, mut handler: impl FnMut(PlaybackState) + Send + 'static) -> Self {
        self.on(EventFlag::PlaybackStateChanged, move |event| {
            if let PlayerEvent::PlaybackStateChanged { playback_state } = event {
                handler(*playback_state);
            }
        })
    }

    #[must_use]
    pub fn on_is_playing(self, mut handler: impl FnMut(bool) + Send + 'static) -> Self {
        self.on(EventFlag::IsPlayingChanged, move |event| {
            if let PlayerEvent::IsPlayingChanged { is_playing } = event {
                handler(*is_playing);
            }
        })
    }

    #[must_use]
    pub fn on_media_item_transition(
        self,
        mut handler: impl FnMut(Option<&MediaItem>, MediaItemTransitionReason) + Send + 'static,
    ) -> Self {
        self.on(EventFlag::MediaItemTransition, move |event| {
            if let PlayerEvent::MediaItemTransition { media_item, reason } = event {
                handler(media_item.as_ref(), *reason);
            }
        })
    }

    #[must_use]
    pub fn on_position_discontinuity(
        self,
        mut handler: impl FnMut(&PositionInfo, &PositionInfo) + Send + 'static,
    ) -> Self {
        self.on(EventFlag::PositionDiscontinuity, move |event| {
            if let PlayerEvent::PositionDiscontinuity {
                old_position,
                new_position,
                ..
            } = event
            {
                handler(old_position, new_position);
            }
        })
    }

    /// Raised errors only; clearing an error is not reported here
    #[must_use]
    pub fn on_player_error(self, mut handler: impl FnMut(&PlayerError) + Send + 'static) -> Self {
        self.on(EventFlag::PlayerErrorChanged, move |event| {
            if let PlayerEvent::PlayerError { error } = event {
                handler(error);
            }
        })
    }
}

impl PlayerListener for ListenerAdapter {
    fn on_event(&mut self, event: &PlayerEvent) {
        let handlers = match event.flag() {
            Some(flag) => match self.handlers.get_mut(&flag) {
                Some(handlers) => handlers,
                None => return,
            },
            None => &mut self.untagged,
        };
        for handler in handlers {
            handler(event);
        }
    }
}
