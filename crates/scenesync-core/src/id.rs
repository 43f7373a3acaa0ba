//! Strongly-typed identifiers and the [`Payload`] type alias.

use std::fmt;
use std::sync::Arc;

/// Identifies an entity slot and the occupant currently living in it.
///
/// `index` is a slot number in the shared entity table; `generation`
/// disambiguates successive occupants of a recycled slot. Two identifiers
/// are equal only if both fields match.
///
/// The ordering is `(index, generation)`, which is the canonical order
/// used by state snapshots and hashing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId {
    /// Slot number in the entity table.
    pub index: u32,
    /// Occupant counter for the slot. Never decreases for a given index.
    pub generation: u32,
}

impl EntityId {
    /// Create an identifier from its two halves.
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

impl From<(u32, u32)> for EntityId {
    fn from((index, generation): (u32, u32)) -> Self {
        Self { index, generation }
    }
}

/// Names a component type/schema.
///
/// Opaque to reconciliation: it is only ever used as a key. Schema
/// validation belongs to whoever owns the live component storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub u32);

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ComponentId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Logical Last-Write-Wins timestamp.
///
/// Not calibrated to wall-clock time. Only the relative order of two
/// timestamps for the same `(entity, component)` key is meaningful.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Timestamp(pub u32);

impl Timestamp {
    /// The timestamp a locally produced write should carry when the
    /// current stored value has timestamp `self`.
    ///
    /// Saturates at `u32::MAX`; a saturated key still accepts writes
    /// through the equal-timestamp rule.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for Timestamp {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Immutable component payload bytes.
///
/// Shared between the decoded message, the reconciliation state and the
/// deltas handed to the storage collaborator, so cloning is a refcount
/// bump rather than a copy.
pub type Payload = Arc<[u8]>;
