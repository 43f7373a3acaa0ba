//! Per-tick buffer between reconciliation and live component storage.
//!
//! Within one tick a component may be added, modified and deleted several
//! times. [`SyncBuffer`] folds those applied deltas into one net operation
//! per (entity, component) and hands the result to a
//! [`ComponentStorage`] in a single flush, so the host constructs or
//! removes each live component at most once per tick.
//!
//! Net effect of a key, from its first and latest effect this tick:
//!
//! | first \ last | Added    | Modified | Deleted   |
//! |--------------|----------|----------|-----------|
//! | Added        | Added    | Added    | NoChanges |
//! | Modified     | Modified | Modified | Deleted   |
//! | Deleted      | Modified | Modified | Deleted   |

use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use scenesync_core::{
    ComponentId, ComponentStorage, EntityId, Payload, ProcessedMessage, ReconciliationEffect,
    StateDelta,
};

type Key = (EntityId, ComponentId);

#[derive(Clone, Debug)]
struct Pending {
    first: ReconciliationEffect,
    last: ReconciliationEffect,
    /// Payload of the latest add or modify.
    data: Option<Payload>,
}

/// Net effect for a key whose first and latest effects this tick are
/// `first` and `last`.
pub fn merge_effects(
    first: ReconciliationEffect,
    last: ReconciliationEffect,
) -> ReconciliationEffect {
    use scenesync_core::ReconciliationEffect::{
        ComponentAdded, ComponentDeleted, ComponentModified, NoChanges,
    };
    match (first, last) {
        (ComponentAdded, ComponentAdded | ComponentModified) => ComponentAdded,
        (ComponentAdded, ComponentDeleted) => NoChanges,
        (ComponentModified | ComponentDeleted, ComponentAdded | ComponentModified) => {
            ComponentModified
        }
        (ComponentModified | ComponentDeleted, ComponentDeleted) => ComponentDeleted,
        _ => NoChanges,
    }
}

/// Storage calls issued by one [`SyncBuffer::flush`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// `upsert` calls.
    pub upserted: usize,
    /// `append_value` calls.
    pub appended: usize,
    /// `remove_component` calls.
    pub removed_components: usize,
    /// `remove_entity` calls.
    pub removed_entities: usize,
}

/// Collects one tick's applied deltas and flushes their net effect.
///
/// # Examples
///
/// ```
/// use scenesync_core::{ComponentId, EntityId, StateDelta, Timestamp};
/// use scenesync_engine::SyncBuffer;
///
/// let e = EntityId::new(0, 0);
/// let mut buf = SyncBuffer::new();
/// buf.push(&StateDelta::ComponentAdded {
///     entity: e,
///     component: ComponentId(1),
///     timestamp: Timestamp(0),
///     data: b"a".as_slice().into(),
/// });
/// buf.push(&StateDelta::ComponentDeleted {
///     entity: e,
///     component: ComponentId(1),
///     timestamp: Timestamp(1),
///     was_live: true,
/// });
/// // Added then deleted within the tick: the host never sees it.
/// assert!(buf.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct SyncBuffer {
    components: IndexMap<Key, Pending>,
    appends: IndexMap<Key, SmallVec<[Payload; 4]>>,
    deleted_entities: IndexSet<EntityId>,
}

impl SyncBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a flush would issue no storage calls.
    pub fn is_empty(&self) -> bool {
        self.deleted_entities.is_empty()
            && self.appends.is_empty()
            && self
                .components
                .values()
                .all(|p| merge_effects(p.first, p.last) == ReconciliationEffect::NoChanges)
    }

    /// Record one applied delta.
    pub fn push(&mut self, delta: &StateDelta) {
        let effect = delta.effect();
        match delta {
            StateDelta::EntityDeleted { entity } => {
                let entity = *entity;
                self.components.retain(|(e, _), _| *e != entity);
                self.appends.retain(|(e, _), _| *e != entity);
                self.deleted_entities.insert(entity);
            }
            StateDelta::ValueAppended {
                entity,
                component,
                data,
                ..
            } => {
                self.appends
                    .entry((*entity, *component))
                    .or_default()
                    .push(data.clone());
            }
            StateDelta::ComponentAdded {
                entity, component, ..
            }
            | StateDelta::ComponentModified {
                entity, component, ..
            }
            | StateDelta::ComponentDeleted {
                entity, component, ..
            } => {
                if effect == ReconciliationEffect::NoChanges {
                    return;
                }
                let data = delta.data().cloned();
                self.components
                    .entry((*entity, *component))
                    .and_modify(|p| {
                        p.last = effect;
                        if data.is_some() {
                            p.data.clone_from(&data);
                        }
                    })
                    .or_insert_with(|| Pending {
                        first: effect,
                        last: effect,
                        data: data.clone(),
                    });
            }
        }
    }

    /// Record the delta of an applied outcome; rejections are ignored.
    ///
    /// A superseded occupant is removed before the delta is recorded.
    pub fn record(&mut self, outcome: &ProcessedMessage) {
        if let Some(entity) = outcome.superseded() {
            self.push(&StateDelta::EntityDeleted { entity });
        }
        if let Some(delta) = outcome.delta() {
            self.push(delta);
        }
    }

    /// Apply the net effect to `storage` and reset for the next tick.
    ///
    /// Entity removals go first so that a recycled index can be
    /// repopulated in the same flush.
    pub fn flush<S>(&mut self, storage: &mut S) -> FlushStats
    where
        S: ComponentStorage + ?Sized,
    {
        let mut stats = FlushStats::default();

        for entity in self.deleted_entities.drain(..) {
            storage.remove_entity(entity);
            stats.removed_entities += 1;
        }

        for ((entity, component), pending) in self.components.drain(..) {
            match merge_effects(pending.first, pending.last) {
                ReconciliationEffect::ComponentAdded | ReconciliationEffect::ComponentModified => {
                    if let Some(data) = &pending.data {
                        storage.upsert(entity, component, data);
                        stats.upserted += 1;
                    }
                }
                ReconciliationEffect::ComponentDeleted => {
                    storage.remove_component(entity, component);
                    stats.removed_components += 1;
                }
                ReconciliationEffect::NoChanges | ReconciliationEffect::EntityDeleted => {}
            }
        }

        for ((entity, component), values) in self.appends.drain(..) {
            for data in &values {
                storage.append_value(entity, component, data);
                stats.appended += 1;
            }
        }

        tracing::trace!(?stats, "sync buffer flushed");
        stats
    }
}
