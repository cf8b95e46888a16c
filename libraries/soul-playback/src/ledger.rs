//! Operation Ledger
//!
//! Counts commands forwarded to the engine and not yet acknowledged. A
//! confirmation may only become the visible state once the count is back to
//! zero; until then a newer local prediction is in force and older
//! confirmations are absorbed.

use crate::types::{DiscontinuityReason, PlayWhenReadyChangeReason};

/// Metadata of confirmations collected while the ledger drained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub discontinuity: Option<DiscontinuityReason>,
    pub play_when_ready_change_reason: PlayWhenReadyChangeReason,
}

/// In-flight command counter
#[derive(Debug, Default)]
pub struct OperationLedger {
    pending: usize,
    pending_discontinuity: Option<DiscontinuityReason>,
    pending_play_when_ready_reason: PlayWhenReadyChangeReason,
}

impl OperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands awaiting acknowledgement
    pub fn pending(&self) -> usize {
        self.pending
    }

    pub fn is_settled(&self) -> bool {
        self.pending == 0
    }

    /// Record one command forwarded to the engine
    pub fn record(&mut self) {
        self.pending += 1;
    }

    /// Account for a confirmation
    ///
    /// Discontinuity and play-when-ready metadata accumulate, last write
    /// wins. Returns the accumulated metadata if the ledger is now settled,
    /// in which case the confirmation may be applied. Over-acknowledgement
    /// saturates at zero.
    pub fn acknowledge(
        &mut self,
        operation_acks: usize,
        discontinuity: Option<DiscontinuityReason>,
        play_when_ready_change_reason: Option<PlayWhenReadyChangeReason>,
    ) -> Option<Settlement> {
        if operation_acks > self.pending {
            tracing::warn!(
                pending = self.pending,
                acks = operation_acks,
                "Confirmation acknowledges more operations than pending"
            );
        }
        self.pending = self.pending.saturating_sub(operation_acks);
        if discontinuity.is_some() {
            self.pending_discontinuity = discontinuity;
        }
        if let Some(reason) = play_when_ready_change_reason {
            self.pending_play_when_ready_reason = reason;
        }

        if self.pending > 0 {
            return None;
        }
        Some(Settlement {
            discontinuity: self.pending_discontinuity.take(),
            play_when_ready_change_reason: self.pending_play_when_ready_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_only_when_all_acknowledged() {
        let mut ledger = OperationLedger::new();
        ledger.record();
        ledger.record();
        assert_eq!(ledger.pending(), 2);

        assert_eq!(ledger.acknowledge(1, None, None), None);
        assert!(!ledger.is_settled());

        let settlement = ledger.acknowledge(1, None, None).unwrap();
        assert_eq!(settlement.discontinuity, None);
        assert!(ledger.is_settled());
    }

    #[test]
    fn metadata_accumulates_last_write_wins() {
        let mut ledger = OperationLedger::new();
        ledger.record();
        ledger.record();

        ledger.acknowledge(1, Some(DiscontinuityReason::Seek), None);
        let settlement = ledger
            .acknowledge(
                1,
                Some(DiscontinuityReason::AutoTransition),
                Some(PlayWhenReadyChangeReason::EndOfMediaItem),
            )
            .unwrap();

        assert_eq!(settlement.discontinuity, Some(DiscontinuityReason::AutoTransition));
        assert_eq!(
            settlement.play_when_ready_change_reason,
            PlayWhenReadyChangeReason::EndOfMediaItem
        );
    }

    #[test]
    fn discontinuity_is_consumed_by_settlement() {
        let mut ledger = OperationLedger::new();
        ledger.record();
        let first = ledger.acknowledge(1, Some(DiscontinuityReason::Seek), None).unwrap();
        assert_eq!(first.discontinuity, Some(DiscontinuityReason::Seek));

        let second = ledger.acknowledge(0, None, None).unwrap();
        assert_eq!(second.discontinuity, None);
    }

    #[test]
    fn zero_ack_update_applies_when_settled() {
        let mut ledger = OperationLedger::new();
        assert!(ledger.acknowledge(0, None, None).is_some());

        ledger.record();
        assert!(ledger.acknowledge(0, None, None).is_none());
    }

    #[test]
    fn over_acknowledgement_saturates() {
        let mut ledger = OperationLedger::new();
        ledger.record();
        assert!(ledger.acknowledge(3, None, None).is_some());
        assert_eq!(ledger.pending(), 0);
    }
}
