//! Error types shared across the scenesync workspace.
//!
//! Reconciliation rejections are not errors and live in
//! [`RejectReason`](crate::RejectReason). The enums here cover genuine
//! misuse: lifecycle reports that break the generation invariant, and
//! producers that cannot enqueue.

use thiserror::Error;

use crate::id::EntityId;

/// Errors from reporting entity lifecycle changes to a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The reported generation is not newer than the slot's current one.
    ///
    /// Generations for an index never decrease and never repeat, so a
    /// report for an already-dead generation is also a regression.
    #[error("generation regression for {entity}: slot is at generation {current}")]
    GenerationRegression {
        /// The identifier that was reported.
        entity: EntityId,
        /// The generation the slot already holds.
        current: u32,
    },
    /// The index exceeds the session's configured entity capacity.
    #[error("entity index {index} exceeds capacity {max_entities}")]
    IndexOutOfRange {
        /// The reported index.
        index: u32,
        /// Configured `max_entities`.
        max_entities: u32,
    },
}

/// Errors from submitting inbound batches to the ingress queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum IngressError {
    /// The bounded queue is at capacity; the producer should retry later.
    #[error("ingress queue full")]
    QueueFull,
    /// The consuming session has been dropped.
    #[error("ingress queue disconnected")]
    Disconnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_messages_name_the_entity() {
        let err = LifecycleError::GenerationRegression {
            entity: EntityId::new(3, 1),
            current: 2,
        };
        assert_eq!(
            err.to_string(),
            "generation regression for 3v1: slot is at generation 2"
        );
    }

    #[test]
    fn ingress_messages() {
        assert_eq!(IngressError::QueueFull.to_string(), "ingress queue full");
        assert_eq!(
            IngressError::Disconnected.to_string(),
            "ingress queue disconnected"
        );
    }
}
