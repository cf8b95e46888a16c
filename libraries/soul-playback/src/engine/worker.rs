//! Engine worker thread
//!
//! Runs a [`PlaybackBackend`] on a dedicated thread. Commands arrive over a
//! channel; every acknowledging command is confirmed by exactly one posted
//! [`PlaybackInfoUpdate`] carrying one operation ack. Renderer messages are
//! delivered here, on the engine thread.

use super::mailbox::{MailboxSender, PlaybackInfoUpdate};
use super::{EngineCommand, ExecutionEngine};
use crate::error::{PlaybackError, Result};
use crate::renderer::RendererSet;
use crate::snapshot::PlaybackSnapshot;
use crate::types::{DiscontinuityReason, PlayWhenReadyChangeReason};
use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// What the backend reports after handling a command or a tick
#[derive(Debug, Clone, PartialEq)]
pub struct EngineOutput {
    pub snapshot: PlaybackSnapshot,
    pub discontinuity: Option<DiscontinuityReason>,
    pub play_when_ready_change_reason: Option<PlayWhenReadyChangeReason>,
}

impl EngineOutput {
    pub fn new(snapshot: PlaybackSnapshot) -> Self {
        Self {
            snapshot,
            discontinuity: None,
            play_when_ready_change_reason: None,
        }
    }

    #[must_use]
    pub fn with_discontinuity(mut self, reason: DiscontinuityReason) -> Self {
        self.discontinuity = Some(reason);
        self
    }

    #[must_use]
    pub fn with_play_when_ready_change_reason(mut self, reason: PlayWhenReadyChangeReason) -> Self {
        self.play_when_ready_change_reason = Some(reason);
        self
    }

    fn into_update(self, operation_acks: usize) -> PlaybackInfoUpdate {
        PlaybackInfoUpdate {
            snapshot: self.snapshot,
            operation_acks,
            discontinuity: self.discontinuity,
            play_when_ready_change_reason: self.play_when_ready_change_reason,
        }
    }
}

/// The work an engine thread performs
///
/// Renderer messages never reach the backend; the worker delivers them.
pub trait PlaybackBackend: Send + 'static {
    /// Handle a command and report the resulting authoritative state
    fn apply(&mut self, command: EngineCommand) -> EngineOutput;

    /// Called when no command arrived within a tick; report progress, if any
    fn poll(&mut self) -> Option<EngineOutput> {
        None
    }

    fn set_foreground_mode(&mut self, _foreground: bool) {}

    fn release(&mut self) {}
}

enum Request {
    Command(EngineCommand),
    ForegroundMode { foreground: bool, reply: Sender<()> },
    Release { reply: Sender<()> },
}

/// [`ExecutionEngine`] backed by a worker thread
pub struct EngineThread {
    requests: Sender<Request>,
    handle: Option<JoinHandle<()>>,
}

impl EngineThread {
    /// Start the worker
    ///
    /// `tick` bounds how long the worker waits for a command before polling
    /// the backend.
    pub fn spawn<B: PlaybackBackend>(
        backend: B,
        renderers: RendererSet,
        updates: MailboxSender,
        tick: Duration,
    ) -> Result<Self> {
        let (requests, request_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("soul-playback-engine".to_string())
            .spawn(move || {
                Self::worker_thread(backend, &renderers, &updates, &request_rx, tick);
            })
            .map_err(|e| PlaybackError::EngineSpawn(e.to_string()))?;

        Ok(Self {
            requests,
            handle: Some(handle),
        })
    }

    fn worker_thread<B: PlaybackBackend>(
        mut backend: B,
        renderers: &RendererSet,
        updates: &MailboxSender,
        requests: &Receiver<Request>,
        tick: Duration,
    ) {
        tracing::debug!("Engine thread started");

        loop {
            match requests.recv_timeout(tick) {
                Ok(Request::Command(EngineCommand::SendMessage(message))) => {
                    renderers.deliver(&message);
                }
                Ok(Request::Command(command)) => {
                    let acks = usize::from(command.acknowledges());
                    let output = backend.apply(command);
                    if !updates.post(output.into_update(acks)) {
                        tracing::debug!("Player mailbox closed, stopping engine thread");
                        break;
                    }
                }
                Ok(Request::ForegroundMode { foreground, reply }) => {
                    backend.set_foreground_mode(foreground);
                    let _ = reply.send(());
                }
                Ok(Request::Release { reply }) => {
                    backend.release();
                    let _ = reply.send(());
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if let Some(output) = backend.poll() {
                        if !updates.post(output.into_update(0)) {
                            break;
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::debug!("Engine request channel disconnected");
                    break;
                }
            }
        }

        tracing::debug!("Engine thread exiting");
    }

    fn request_and_wait(&self, request: Request, reply: &Receiver<()>, timeout: Option<Duration>) -> bool {
        if self.requests.send(request).is_err() {
            return false;
        }
        match timeout {
            Some(timeout) => reply.recv_timeout(timeout).is_ok(),
            None => reply.recv().is_ok(),
        }
    }
}

impl ExecutionEngine for EngineThread {
    fn submit(&mut self, command: EngineCommand) -> Result<()> {
        self.requests
            .send(Request::Command(command))
            .map_err(|_| PlaybackError::EngineDisconnected)
    }

    fn set_foreground_mode(&mut self, foreground: bool, timeout: Option<Duration>) -> bool {
        let (reply, reply_rx) = bounded(1);
        self.request_and_wait(Request::ForegroundMode { foreground, reply }, &reply_rx, timeout)
    }

    fn release(&mut self, timeout: Duration) -> bool {
        let (reply, reply_rx) = bounded(1);
        let released = self.request_and_wait(Request::Release { reply }, &reply_rx, Some(timeout));
        if released {
            if let Some(handle) = self.handle.take() {
                if handle.join().is_err() {
                    tracing::error!("Engine thread panicked");
                }
            }
        }
        released
    }
}

impl std::fmt::Debug for EngineThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineThread")
            .field("running", &self.handle.is_some())
            .finish()
    }
}
