//! The message model: one CRDT operation on the shared world state.

use crate::id::{ComponentId, EntityId, Payload, Timestamp};

/// Wire discriminant of a [`CrdtMessage`].
///
/// The numeric values are part of the wire format and must never be
/// reassigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageType {
    /// Last-Write-Wins component write.
    PutComponent = 0,
    /// Last-Write-Wins component removal.
    DeleteComponent = 1,
    /// Removal of an entity and everything attached to it.
    DeleteEntity = 2,
    /// Entry appended to an ordered-log component.
    AppendValue = 3,
}

impl MessageType {
    /// Decode a wire discriminant. Returns `None` for unknown values so
    /// the caller can skip forward-incompatible messages.
    pub fn from_wire(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::PutComponent),
            1 => Some(Self::DeleteComponent),
            2 => Some(Self::DeleteEntity),
            3 => Some(Self::AppendValue),
            _ => None,
        }
    }

    /// The wire discriminant.
    pub fn to_wire(self) -> u32 {
        self as u32
    }

    /// Whether messages of this type carry a component id and timestamp.
    pub fn has_component(self) -> bool {
        !matches!(self, Self::DeleteEntity)
    }

    /// Whether messages of this type carry a payload.
    pub fn has_payload(self) -> bool {
        matches!(self, Self::PutComponent | Self::AppendValue)
    }
}

/// A single CRDT operation.
///
/// A closed sum type: every consumer matches exhaustively, so adding an
/// operation is a compile-time-checked change everywhere it is handled.
///
/// # Examples
///
/// ```
/// use scenesync_core::{ComponentId, CrdtMessage, EntityId, MessageType, Timestamp};
///
/// let msg = CrdtMessage::PutComponent {
///     entity: EntityId::new(3, 1),
///     component: ComponentId(7),
///     timestamp: Timestamp(10),
///     data: b"A".as_slice().into(),
/// };
///
/// assert_eq!(msg.message_type(), MessageType::PutComponent);
/// assert_eq!(msg.component(), Some(ComponentId(7)));
/// assert_eq!(msg.data(), Some(b"A".as_slice()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CrdtMessage {
    /// Declares new component data.
    PutComponent {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// LWW timestamp.
        timestamp: Timestamp,
        /// Serialized component value.
        data: Payload,
    },
    /// Removes a component's data, leaving a timestamped tombstone.
    DeleteComponent {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// LWW timestamp.
        timestamp: Timestamp,
    },
    /// Removes an entity and all of its components. Absolute: no timestamp.
    DeleteEntity {
        /// The entity to remove.
        entity: EntityId,
    },
    /// Appends an entry to an ordered-log component.
    AppendValue {
        /// Owning entity.
        entity: EntityId,
        /// Component key.
        component: ComponentId,
        /// Position of the entry within the log.
        timestamp: Timestamp,
        /// Serialized entry.
        data: Payload,
    },
}

impl CrdtMessage {
    /// The wire discriminant for this message.
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::PutComponent { .. } => MessageType::PutComponent,
            Self::DeleteComponent { .. } => MessageType::DeleteComponent,
            Self::DeleteEntity { .. } => MessageType::DeleteEntity,
            Self::AppendValue { .. } => MessageType::AppendValue,
        }
    }

    /// The entity this message targets.
    pub fn entity(&self) -> EntityId {
        match self {
            Self::PutComponent { entity, .. }
            | Self::DeleteComponent { entity, .. }
            | Self::DeleteEntity { entity }
            | Self::AppendValue { entity, .. } => *entity,
        }
    }

    /// The component key, absent for `DeleteEntity`.
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            Self::PutComponent { component, .. }
            | Self::DeleteComponent { component, .. }
            | Self::AppendValue { component, .. } => Some(*component),
            Self::DeleteEntity { .. } => None,
        }
    }

    /// The timestamp, absent for `DeleteEntity`.
    pub fn timestamp(&self) -> Option<Timestamp> {
        match self {
            Self::PutComponent { timestamp, .. }
            | Self::DeleteComponent { timestamp, .. }
            | Self::AppendValue { timestamp, .. } => Some(*timestamp),
            Self::DeleteEntity { .. } => None,
        }
    }

    /// The payload bytes, present only for `PutComponent` and `AppendValue`.
    pub fn data(&self) -> Option<&[u8]> {
        match self {
            Self::PutComponent { data, .. } | Self::AppendValue { data, .. } => Some(&data[..]),
            Self::DeleteComponent { .. } | Self::DeleteEntity { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_discriminants_are_stable() {
        assert_eq!(MessageType::PutComponent.to_wire(), 0);
        assert_eq!(MessageType::DeleteComponent.to_wire(), 1);
        assert_eq!(MessageType::DeleteEntity.to_wire(), 2);
        assert_eq!(MessageType::AppendValue.to_wire(), 3);
    }

    #[test]
    fn unknown_discriminant_is_none() {
        assert_eq!(MessageType::from_wire(4), None);
        assert_eq!(MessageType::from_wire(u32::MAX), None);
    }

    #[test]
    fn from_wire_inverts_to_wire() {
        for ty in [
            MessageType::PutComponent,
            MessageType::DeleteComponent,
            MessageType::DeleteEntity,
            MessageType::AppendValue,
        ] {
            assert_eq!(MessageType::from_wire(ty.to_wire()), Some(ty));
        }
    }

    #[test]
    fn delete_entity_has_no_component_or_timestamp() {
        let msg = CrdtMessage::DeleteEntity {
            entity: EntityId::new(1, 0),
        };
        assert_eq!(msg.component(), None);
        assert_eq!(msg.timestamp(), None);
        assert_eq!(msg.data(), None);
        assert!(!msg.message_type().has_component());
    }

    #[test]
    fn delete_component_has_no_payload() {
        let msg = CrdtMessage::DeleteComponent {
            entity: EntityId::new(1, 0),
            component: ComponentId(2),
            timestamp: Timestamp(3),
        };
        assert_eq!(msg.timestamp(), Some(Timestamp(3)));
        assert_eq!(msg.data(), None);
        assert!(msg.message_type().has_component());
        assert!(!msg.message_type().has_payload());
    }
}
