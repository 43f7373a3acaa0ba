//! Reconciliation outcomes: what happened to one message.

use std::fmt;

use crate::id::{ComponentId, EntityId, Payload, Timestamp};

/// Why a message lost reconciliation.
///
/// None of these are errors: they are routine outcomes of concurrent
/// producers racing on the same key, and never abort a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// The message lost the LWW race (older timestamp, exact duplicate,
    /// superseded entity deletion, or an append that fell off a full log).
    Stale,
    /// The message targets an entity that is dead, recycled, or was
    /// never registered.
    EntityDead,
    /// The message decoded but violates a session limit (entity index
    /// out of range, oversized payload), or did not decode at all.
    Malformed,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stale => write!(f, "stale"),
            Self::EntityDead => write!(f, "entity dead"),
            Self::Malformed => write!(f, "malformed"),
        }
    }
}

/// Net effect of a change on the live component storage.
///
/// This is what the storage collaborator needs to know to construct,
/// update or remove a live component instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReconciliationEffect {
    /// Nothing observable changed.
    NoChanges,
    /// A component appeared where none was live before.
    ComponentAdded,
    /// A live component received new data.
    ComponentModified,
    /// A live component was removed.
    ComponentDeleted,
    /// The entity and all of its components were removed.
    EntityDeleted,
}

/// The state change produced by an applied message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StateDelta {
    /// A component now has data where it had none (absent or tombstoned).
    ComponentAdded {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// Winning timestamp.
        timestamp: Timestamp,
        /// Winning data.
        data: Payload,
    },
    /// A live component's data was replaced.
    ComponentModified {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// Winning timestamp.
        timestamp: Timestamp,
        /// Winning data.
        data: Payload,
    },
    /// A component was tombstoned.
    ComponentDeleted {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// Tombstone timestamp.
        timestamp: Timestamp,
        /// Whether the component held data before this delete. A delete
        /// of an absent component still records its tombstone.
        was_live: bool,
    },
    /// An entry was inserted into an ordered log.
    ValueAppended {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// Entry position.
        timestamp: Timestamp,
        /// Entry data.
        data: Payload,
    },
    /// The entity was marked dead and all of its state cleared.
    EntityDeleted {
        /// The removed entity.
        entity: EntityId,
    },
}

impl StateDelta {
    /// The entity this delta concerns.
    pub fn entity(&self) -> EntityId {
        match self {
            Self::ComponentAdded { entity, .. }
            | Self::ComponentModified { entity, .. }
            | Self::ComponentDeleted { entity, .. }
            | Self::ValueAppended { entity, .. }
            | Self::EntityDeleted { entity } => *entity,
        }
    }

    /// The component key, absent for entity deletion.
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            Self::ComponentAdded { component, .. }
            | Self::ComponentModified { component, .. }
            | Self::ComponentDeleted { component, .. }
            | Self::ValueAppended { component, .. } => Some(*component),
            Self::EntityDeleted { .. } => None,
        }
    }

    /// The payload carried forward to live storage, if any.
    pub fn data(&self) -> Option<&Payload> {
        match self {
            Self::ComponentAdded { data, .. }
            | Self::ComponentModified { data, .. }
            | Self::ValueAppended { data, .. } => Some(data),
            Self::ComponentDeleted { .. } | Self::EntityDeleted { .. } => None,
        }
    }

    /// What the storage collaborator has to do for this delta.
    ///
    /// Appends surface as additions: each entry is a new event for the
    /// consumer.
    pub fn effect(&self) -> ReconciliationEffect {
        match self {
            Self::ComponentAdded { .. } | Self::ValueAppended { .. } => {
                ReconciliationEffect::ComponentAdded
            }
            Self::ComponentModified { .. } => ReconciliationEffect::ComponentModified,
            Self::ComponentDeleted { was_live: true, .. } => {
                ReconciliationEffect::ComponentDeleted
            }
            Self::ComponentDeleted { was_live: false, .. } => ReconciliationEffect::NoChanges,
            Self::EntityDeleted { .. } => ReconciliationEffect::EntityDeleted,
        }
    }
}

/// Outcome of reconciling one input message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessedMessage {
    /// The message won and changed the authoritative state.
    Applied {
        /// The change to the addressed entity.
        delta: StateDelta,
        /// A live entity evicted from the same slot by the message's newer
        /// generation. Its state is gone and live storage must drop it.
        superseded: Option<EntityId>,
    },
    /// The message was rejected; state is untouched.
    Rejected(RejectReason),
}

impl ProcessedMessage {
    /// An applied outcome that displaced nobody.
    pub fn applied(delta: StateDelta) -> Self {
        Self::Applied {
            delta,
            superseded: None,
        }
    }

    /// Whether the message changed state.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// The rejection reason, if rejected.
    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            Self::Applied { .. } => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }

    /// The applied delta, if applied.
    pub fn delta(&self) -> Option<&StateDelta> {
        match self {
            Self::Applied { delta, .. } => Some(delta),
            Self::Rejected(_) => None,
        }
    }

    /// The previous occupant of the slot, if this message recycled it.
    pub fn superseded(&self) -> Option<EntityId> {
        match self {
            Self::Applied { superseded, .. } => *superseded,
            Self::Rejected(_) => None,
        }
    }

    /// The effect on live storage; rejections have none.
    pub fn effect(&self) -> ReconciliationEffect {
        match self {
            Self::Applied { delta, .. } => delta.effect(),
            Self::Rejected(_) => ReconciliationEffect::NoChanges,
        }
    }
}
