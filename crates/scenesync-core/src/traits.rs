//! Seams to the collaborators that live outside the core.

use crate::id::{ComponentId, EntityId};

/// Live component storage owned by the host simulation/rendering engine.
///
/// Reconciled results are pushed through this trait once per tick by the
/// engine's sync buffer. Component identifiers are opaque here; if the
/// storage does not know a component it decides what to do with it.
pub trait ComponentStorage {
    /// Create or overwrite the component with `data`.
    fn upsert(&mut self, entity: EntityId, component: ComponentId, data: &[u8]);

    /// Add one entry to a log-style component.
    ///
    /// Defaults to [`upsert`](Self::upsert) for storages that only keep the
    /// latest entry.
    fn append_value(&mut self, entity: EntityId, component: ComponentId, data: &[u8]) {
        self.upsert(entity, component, data);
    }

    /// Remove a single component. Removing an absent component is a no-op.
    fn remove_component(&mut self, entity: EntityId, component: ComponentId);

    /// Remove the entity and everything attached to it.
    fn remove_entity(&mut self, entity: EntityId);
}
