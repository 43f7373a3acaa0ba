//! Mock component storage.

use std::collections::BTreeMap;

use scenesync_core::{ComponentId, ComponentStorage, EntityId};

/// One call made against a [`RecordingStorage`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageOp {
    Upsert(EntityId, ComponentId, Vec<u8>),
    Append(EntityId, ComponentId, Vec<u8>),
    RemoveComponent(EntityId, ComponentId),
    RemoveEntity(EntityId),
}

/// In-memory [`ComponentStorage`] that records every call.
///
/// `live` mirrors what a real host would hold after applying the calls;
/// appended values accumulate per key and only go away with their entity.
#[derive(Debug, Default)]
pub struct RecordingStorage {
    pub ops: Vec<StorageOp>,
    pub live: BTreeMap<(EntityId, ComponentId), Vec<u8>>,
    pub logs: BTreeMap<(EntityId, ComponentId), Vec<Vec<u8>>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a component, if present.
    pub fn get(&self, entity: EntityId, component: ComponentId) -> Option<&[u8]> {
        self.live.get(&(entity, component)).map(Vec::as_slice)
    }
}

impl ComponentStorage for RecordingStorage {
    fn upsert(&mut self, entity: EntityId, component: ComponentId, data: &[u8]) {
        self.ops
            .push(StorageOp::Upsert(entity, component, data.to_vec()));
        self.live.insert((entity, component), data.to_vec());
    }

    fn append_value(&mut self, entity: EntityId, component: ComponentId, data: &[u8]) {
        self.ops
            .push(StorageOp::Append(entity, component, data.to_vec()));
        self.logs
            .entry((entity, component))
            .or_default()
            .push(data.to_vec());
    }

    fn remove_component(&mut self, entity: EntityId, component: ComponentId) {
        self.ops.push(StorageOp::RemoveComponent(entity, component));
        self.live.remove(&(entity, component));
    }

    fn remove_entity(&mut self, entity: EntityId) {
        self.ops.push(StorageOp::RemoveEntity(entity));
        self.live.retain(|(e, _), _| *e != entity);
        self.logs.retain(|(e, _), _| *e != entity);
    }
}
