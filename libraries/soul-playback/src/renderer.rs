//! Messaging Bridge
//!
//! Renderers live behind the execution engine. The player talks to them only
//! through typed [`PlayerMessage`]s the engine delivers on its own thread.
//! A message can be waited on with a timeout; a message that times out is
//! cancelled, so a late engine never delivers it.

use crate::snapshot::Format;
use crate::types::{FormatSupport, TrackType, VideoScalingMode};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A renderer the engine drives
pub trait Renderer: Send + Sync {
    fn track_type(&self) -> TrackType;

    /// How well this renderer handles `format`
    fn supports_format(&self, format: &Format) -> FormatSupport;

    /// Apply a message; called on the engine thread
    fn handle_message(&self, payload: &MessagePayload);
}

/// Surface video is rendered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoOutput {
    pub id: u64,
    pub name: String,
}

impl VideoOutput {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Typed renderer message
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePayload {
    Volume(f32),
    AudioSessionId(u32),
    SkipSilenceEnabled(bool),
    VideoScalingMode(VideoScalingMode),
    /// Attach an output, or detach with `None`
    VideoOutput(Option<VideoOutput>),
}

/// Message addressed to one renderer
#[derive(Debug)]
pub struct PlayerMessage {
    /// Index into the renderer set
    pub target: usize,
    pub payload: MessagePayload,
    cancelled: Arc<AtomicBool>,
    delivered: Sender<()>,
}

impl PlayerMessage {
    /// Message and the receipt its sender may wait on
    pub fn new(target: usize, payload: MessagePayload) -> (Self, DeliveryReceipt) {
        let (delivered, receipt) = bounded(1);
        let cancelled = Arc::new(AtomicBool::new(false));
        let message = Self {
            target,
            payload,
            cancelled: Arc::clone(&cancelled),
            delivered,
        };
        (
            message,
            DeliveryReceipt {
                receipt,
                cancelled,
            },
        )
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Signal delivery to a waiting sender
    pub fn mark_delivered(&self) {
        // Nobody waiting is fine
        let _ = self.delivered.try_send(());
    }
}

/// Sender side handle of a [`PlayerMessage`]
#[derive(Debug)]
pub struct DeliveryReceipt {
    receipt: Receiver<()>,
    cancelled: Arc<AtomicBool>,
}

impl DeliveryReceipt {
    /// Wait until the message was delivered
    ///
    /// Returns false on timeout, or if the message was dropped undelivered.
    /// A message that timed out is cancelled.
    pub fn block_until_delivered(&self, timeout: Duration) -> bool {
        match self.receipt.recv_timeout(timeout) {
            Ok(()) => true,
            Err(RecvTimeoutError::Timeout) => {
                self.cancelled.store(true, Ordering::SeqCst);
                false
            }
            Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

/// The renderers of a player, in message-target order
#[derive(Clone, Default)]
pub struct RendererSet {
    renderers: Vec<Arc<dyn Renderer>>,
}

impl RendererSet {
    pub fn new(renderers: Vec<Arc<dyn Renderer>>) -> Self {
        Self { renderers }
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    pub fn has_track_type(&self, track_type: TrackType) -> bool {
        self.renderers.iter().any(|r| r.track_type() == track_type)
    }

    /// Indices of the renderers of one track type
    pub fn indices_of(&self, track_type: TrackType) -> Vec<usize> {
        self.renderers
            .iter()
            .enumerate()
            .filter(|(_, r)| r.track_type() == track_type)
            .map(|(i, _)| i)
            .collect()
    }

    /// Best support any renderer of the format's track type offers
    pub fn supports_format(&self, track_type: TrackType, format: &Format) -> FormatSupport {
        self.renderers
            .iter()
            .filter(|r| r.track_type() == track_type)
            .map(|r| r.supports_format(format))
            .max()
            .unwrap_or(FormatSupport::UnsupportedType)
    }

    /// Deliver a message on the calling (engine) thread
    ///
    /// Cancelled messages and messages to unknown targets are dropped.
    pub fn deliver(&self, message: &PlayerMessage) {
        if message.is_cancelled() {
            tracing::debug!(target = message.target, "Dropping cancelled renderer message");
            return;
        }
        match self.renderers.get(message.target) {
            Some(renderer) => {
                renderer.handle_message(&message.payload);
                message.mark_delivered();
            }
            None => tracing::warn!(target = message.target, "Message for unknown renderer"),
        }
    }
}

impl std::fmt::Debug for RendererSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let types: Vec<_> = self.renderers.iter().map(|r| r.track_type()).collect();
        f.debug_struct("RendererSet").field("renderers", &types).finish()
    }
}
