//! Confirmation mailbox
//!
//! Single-consumer queue of [`PlaybackInfoUpdate`]s, processed by the player
//! on its caller thread strictly in arrival order.

use crate::snapshot::PlaybackSnapshot;
use crate::types::{DiscontinuityReason, PlayWhenReadyChangeReason};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Authoritative state reported by the execution engine
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackInfoUpdate {
    pub snapshot: PlaybackSnapshot,
    /// Commands this update confirms
    pub operation_acks: usize,
    pub discontinuity: Option<DiscontinuityReason>,
    pub play_when_ready_change_reason: Option<PlayWhenReadyChangeReason>,
}

impl PlaybackInfoUpdate {
    /// Update confirming no command
    pub fn new(snapshot: PlaybackSnapshot) -> Self {
        Self {
            snapshot,
            operation_acks: 0,
            discontinuity: None,
            play_when_ready_change_reason: None,
        }
    }

    #[must_use]
    pub fn acknowledging(mut self, operation_acks: usize) -> Self {
        self.operation_acks = operation_acks;
        self
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
}

/// Posting side, cloned into the engine
#[derive(Debug, Clone)]
pub struct MailboxSender {
    sender: Sender<PlaybackInfoUpdate>,
}

impl MailboxSender {
    /// Post an update; returns false once the player is gone
    pub fn post(&self, update: PlaybackInfoUpdate) -> bool {
        self.sender.send(update).is_ok()
    }
}

/// Receiving side, owned by the player
#[derive(Debug)]
pub struct Mailbox {
    receiver: Receiver<PlaybackInfoUpdate>,
}

impl Mailbox {
    pub fn try_recv(&self) -> Option<PlaybackInfoUpdate> {
        match self.receiver.try_recv() {
            Ok(update) => Some(update),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PlaybackInfoUpdate> {
        match self.receiver.recv_timeout(timeout) {
            Ok(update) => Some(update),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

/// Connected sender and mailbox
pub fn mailbox() -> (MailboxSender, Mailbox) {
    let (sender, receiver) = unbounded();
    (MailboxSender { sender }, Mailbox { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_arrive_in_posting_order() {
        let (sender, mailbox) = mailbox();
        let first = PlaybackInfoUpdate::new(PlaybackSnapshot::initial()).acknowledging(1);
        let second = PlaybackInfoUpdate::new(PlaybackSnapshot::initial())
            .acknowledging(2)
            .with_discontinuity(DiscontinuityReason::Seek);

        assert!(sender.post(first));
        assert!(sender.post(second));
        assert_eq!(mailbox.len(), 2);
        assert_eq!(mailbox.try_recv().map(|u| u.operation_acks), Some(1));
        let second = mailbox.try_recv().unwrap();
        assert_eq!(second.operation_acks, 2);
        assert_eq!(second.discontinuity, Some(DiscontinuityReason::Seek));
        assert!(mailbox.try_recv().is_none());
    }

    #[test]
    fn posting_fails_after_mailbox_dropped() {
        let (sender, mailbox) = mailbox();
        drop(mailbox);
        assert!(!sender.post(PlaybackInfoUpdate::new(PlaybackSnapshot::initial())));
    }
}
