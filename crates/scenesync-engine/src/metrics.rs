//! Reconciliation counters for a session.
//!
//! [`ReconcileMetrics`] is cumulative over the session's lifetime and cheap
//! to copy out for telemetry.

use scenesync_core::{ProcessedMessage, RejectReason};

/// Cumulative counters collected by a [`Session`](crate::Session).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileMetrics {
    /// Messages that changed state.
    pub applied: u64,
    /// Messages that lost the LWW race or were exact replays.
    pub stale: u64,
    /// Messages addressed to a dead, superseded or unknown entity.
    pub entity_dead: u64,
    /// Messages that decoded but exceed a configured bound.
    pub malformed: u64,
    /// Messages the decoder skipped.
    pub decode_skipped: u64,
    /// Messages the decoder produced.
    pub messages_decoded: u64,
    /// Inbound bytes consumed by the decoder.
    pub bytes_consumed: u64,
}

impl ReconcileMetrics {
    /// Count one reconciliation outcome.
    pub fn record(&mut self, outcome: &ProcessedMessage) {
        match outcome {
            ProcessedMessage::Applied { .. } => self.applied += 1,
            ProcessedMessage::Rejected(RejectReason::Stale) => self.stale += 1,
            ProcessedMessage::Rejected(RejectReason::EntityDead) => self.entity_dead += 1,
            ProcessedMessage::Rejected(RejectReason::Malformed) => self.malformed += 1,
        }
    }

    /// Total rejections of any kind.
    pub fn rejected(&self) -> u64 {
        self.stale + self.entity_dead + self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenesync_core::{EntityId, StateDelta};

    #[test]
    fn default_metrics_are_zero() {
        let m = ReconcileMetrics::default();
        assert_eq!(m.applied, 0);
        assert_eq!(m.rejected(), 0);
        assert_eq!(m.decode_skipped, 0);
        assert_eq!(m.messages_decoded, 0);
        assert_eq!(m.bytes_consumed, 0);
    }

    #[test]
    fn record_counts_each_outcome() {
        let mut m = ReconcileMetrics::default();
        m.record(&ProcessedMessage::applied(StateDelta::EntityDeleted {
            entity: EntityId::new(0, 0),
        }));
        m.record(&ProcessedMessage::Rejected(RejectReason::Stale));
        m.record(&ProcessedMessage::Rejected(RejectReason::Stale));
        m.record(&ProcessedMessage::Rejected(RejectReason::EntityDead));
        m.record(&ProcessedMessage::Rejected(RejectReason::Malformed));

        assert_eq!(m.applied, 1);
        assert_eq!(m.stale, 2);
        assert_eq!(m.entity_dead, 1);
        assert_eq!(m.malformed, 1);
        assert_eq!(m.rejected(), 4);
    }
}
