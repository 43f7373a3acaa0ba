//! Generational entity table.
//!
//! A dense `Vec` of slots indexed by entity index. Each slot carries the
//! current generation and a liveness flag, so a message for a recycled
//! index is told apart from one for its current occupant with a single
//! comparison. Component state hangs off the slot and is dropped whenever
//! the slot dies or is recycled.

use scenesync_core::{EntityId, LifecycleError, RejectReason};

use crate::config::EntityAdmission;
use crate::store::EntityState;

/// Liveness of one slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SlotState {
    /// Never reported or seen.
    Vacant,
    Alive,
    /// Deleted at the slot's generation; waits for a newer one.
    Dead,
}

#[derive(Clone, Debug)]
pub(crate) struct Slot {
    pub generation: u32,
    pub state: SlotState,
    pub components: EntityState,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            generation: 0,
            state: SlotState::Vacant,
            components: EntityState::default(),
        }
    }

    fn occupy(&mut self, generation: u32, state: SlotState) {
        self.generation = generation;
        self.state = state;
        self.components.clear();
    }
}

/// Outcome of a successful `DeleteEntity`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Deletion {
    /// A live entity was killed.
    Killed,
    /// The slot was unknown or older and is now recorded dead at the
    /// message's generation. `superseded` is the older occupant if it was
    /// still alive.
    Recorded { superseded: Option<EntityId> },
}

/// Writable state of an admitted entity.
pub(crate) struct Admitted<'a> {
    pub state: &'a mut EntityState,
    /// Live occupant evicted by admitting a newer generation.
    pub superseded: Option<EntityId>,
}

pub(crate) struct EntityTable {
    slots: Vec<Slot>,
    max_entities: u32,
    admission: EntityAdmission,
    alive: usize,
}

impl EntityTable {
    pub fn new(max_entities: u32, admission: EntityAdmission) -> Self {
        Self {
            slots: Vec::new(),
            max_entities,
            admission,
            alive: 0,
        }
    }

    /// Number of alive entities.
    pub fn alive_count(&self) -> usize {
        self.alive
    }

    pub fn slots(&self) -> impl Iterator<Item = (u32, &Slot)> {
        (0u32..).zip(self.slots.iter())
    }

    fn in_range(&self, index: u32) -> bool {
        index < self.max_entities
    }

    fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    /// Slot for `index`, growing the table up to it. Callers check the
    /// range first.
    fn slot_mut_or_grow(&mut self, index: u32) -> &mut Slot {
        let idx = index as usize;
        if idx >= self.slots.len() {
            self.slots.resize_with(idx + 1, Slot::vacant);
        }
        &mut self.slots[idx]
    }

    /// Set a slot's occupancy, keeping the alive count in step.
    ///
    /// Returns the previous occupant if it was alive at another generation.
    fn transition(&mut self, index: u32, generation: u32, state: SlotState) -> Option<EntityId> {
        let slot = self.slot_mut_or_grow(index);
        let was_alive = slot.state == SlotState::Alive;
        let previous = slot.generation;
        slot.occupy(generation, state);
        let is_alive = state == SlotState::Alive;
        match (was_alive, is_alive) {
            (false, true) => self.alive += 1,
            (true, false) => self.alive -= 1,
            _ => {}
        }
        (was_alive && previous != generation).then(|| EntityId::new(index, previous))
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.slot(entity.index)
            .is_some_and(|s| s.state == SlotState::Alive && s.generation == entity.generation)
    }

    /// Current generation of `index`, alive or dead.
    pub fn generation_of(&self, index: u32) -> Option<u32> {
        self.slot(index)
            .filter(|s| s.state != SlotState::Vacant)
            .map(|s| s.generation)
    }

    /// Component state of `entity` if it is alive at that generation.
    pub fn state(&self, entity: EntityId) -> Option<&EntityState> {
        self.slot(entity.index)
            .filter(|s| s.state == SlotState::Alive && s.generation == entity.generation)
            .map(|s| &s.components)
    }

    /// Component state `entity` may write to, admitting it first under
    /// [`EntityAdmission::Implicit`].
    pub fn admit(&mut self, entity: EntityId) -> Result<Admitted<'_>, RejectReason> {
        if !self.in_range(entity.index) {
            return Err(RejectReason::Malformed);
        }
        let (state, generation) = match self.slot(entity.index) {
            Some(s) => (s.state, s.generation),
            None => (SlotState::Vacant, 0),
        };
        let admitted = match (state, self.admission) {
            (SlotState::Alive, _) if generation == entity.generation => true,
            (_, EntityAdmission::Registered) => false,
            (SlotState::Vacant, EntityAdmission::Implicit) => true,
            (_, EntityAdmission::Implicit) => entity.generation > generation,
        };
        if !admitted {
            return Err(RejectReason::EntityDead);
        }
        let mut superseded = None;
        if state != SlotState::Alive || generation != entity.generation {
            tracing::debug!(entity = %entity, "entity admitted");
            superseded = self.transition(entity.index, entity.generation, SlotState::Alive);
        }
        Ok(Admitted {
            state: &mut self.slot_mut_or_grow(entity.index).components,
            superseded,
        })
    }

    /// Kill `entity` and drop its component state.
    ///
    /// Deleting an identifier that is already dead or superseded is
    /// `Stale`; only the first delete of a live generation takes effect.
    pub fn delete(&mut self, entity: EntityId) -> Result<Deletion, RejectReason> {
        if !self.in_range(entity.index) {
            return Err(RejectReason::Malformed);
        }
        let (state, generation) = match self.slot(entity.index) {
            Some(s) => (s.state, s.generation),
            None => (SlotState::Vacant, 0),
        };
        let killed = match (state, self.admission) {
            (SlotState::Alive, _) if generation == entity.generation => true,
            (SlotState::Vacant, EntityAdmission::Registered) => {
                return Err(RejectReason::EntityDead)
            }
            (SlotState::Vacant, EntityAdmission::Implicit) => false,
            (_, EntityAdmission::Implicit) if entity.generation > generation => false,
            _ => return Err(RejectReason::Stale),
        };
        let superseded = self.transition(entity.index, entity.generation, SlotState::Dead);
        let outcome = if killed {
            Deletion::Killed
        } else {
            Deletion::Recorded { superseded }
        };
        tracing::debug!(entity = %entity, ?outcome, "entity deleted");
        Ok(outcome)
    }

    /// Record a generation reported by the lifecycle owner.
    pub fn register(&mut self, entity: EntityId) -> Result<(), LifecycleError> {
        if !self.in_range(entity.index) {
            return Err(LifecycleError::IndexOutOfRange {
                index: entity.index,
                max_entities: self.max_entities,
            });
        }
        let (state, generation) = match self.slot(entity.index) {
            Some(s) => (s.state, s.generation),
            None => (SlotState::Vacant, 0),
        };
        match state {
            SlotState::Vacant => {}
            SlotState::Alive if generation == entity.generation => return Ok(()),
            _ if entity.generation > generation => {
                tracing::debug!(entity = %entity, previous = generation, "entity slot recycled");
            }
            _ => {
                return Err(LifecycleError::GenerationRegression {
                    entity,
                    current: generation,
                })
            }
        }
        // The lifecycle owner drove the recycle and already knows the old
        // occupant is gone.
        self.transition(entity.index, entity.generation, SlotState::Alive);
        Ok(())
    }
}
