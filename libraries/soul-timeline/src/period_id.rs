//! Identity of the period being played or loaded

use crate::uid::Uid;

/// Position in play order: a period, optionally an ad inside it, and the
/// sequence number of the window visit
///
/// The window sequence number grows every time the execution engine enters a
/// window, so repeated visits to the same period (a loop) are told apart.
/// Masked identities carry no sequence number until the engine assigns one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeriodId {
    pub period_uid: Uid,
    pub ad_group_index: Option<usize>,
    pub ad_index_in_ad_group: Option<usize>,
    pub window_sequence_number: Option<u64>,
    /// Ad group that follows clipped content, if content stops at a cue point
    pub next_ad_group_index: Option<usize>,
}

impl PeriodId {
    /// Content period without a sequence number
    pub fn new(period_uid: Uid) -> Self {
        Self {
            period_uid,
            ad_group_index: None,
            ad_index_in_ad_group: None,
            window_sequence_number: None,
            next_ad_group_index: None,
        }
    }

    /// Content period in a known window visit
    pub fn with_sequence(period_uid: Uid, window_sequence_number: u64) -> Self {
        Self {
            window_sequence_number: Some(window_sequence_number),
            ..Self::new(period_uid)
        }
    }

    /// Ad inside a period
    pub fn ad(
        period_uid: Uid,
        ad_group_index: usize,
        ad_index_in_ad_group: usize,
        window_sequence_number: u64,
    ) -> Self {
        Self {
            period_uid,
            ad_group_index: Some(ad_group_index),
            ad_index_in_ad_group: Some(ad_index_in_ad_group),
            window_sequence_number: Some(window_sequence_number),
            next_ad_group_index: None,
        }
    }

    /// Reserved identity used while the timeline is empty
    pub fn dummy() -> Self {
        Self::new(Uid::DUMMY)
    }

    pub fn with_next_ad_group(mut self, next_ad_group_index: usize) -> Self {
        self.next_ad_group_index = Some(next_ad_group_index);
        self
    }

    pub fn is_ad(&self) -> bool {
        self.ad_group_index.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masked_id_has_no_sequence() {
        let id = PeriodId::new(Uid::local(1));
        assert!(!id.is_ad());
        assert_eq!(id.window_sequence_number, None);
    }

    #[test]
    fn unset_sequence_orders_before_any_visit() {
        let masked = PeriodId::new(Uid::local(1));
        let visited = PeriodId::with_sequence(Uid::local(1), 0);
        assert!(masked.window_sequence_number < visited.window_sequence_number);
    }

    #[test]
    fn ad_ids_report_ad() {
        let id = PeriodId::ad(Uid::local(0), 1, 0, 4);
        assert!(id.is_ad());
        assert_eq!(id.ad_group_index, Some(1));
    }
}
