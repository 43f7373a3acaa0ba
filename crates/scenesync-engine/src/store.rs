//! Per-entity component state: LWW registers and append logs.
//!
//! Each live entity owns one [`EntityState`]. Both maps preserve insertion
//! order so that the state snapshot replays components in the order they
//! first appeared.

use indexmap::IndexMap;
use scenesync_core::{ComponentId, EntityId, Payload, RejectReason, StateDelta, Timestamp};

/// Current value of one LWW register.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LwwEntry {
    pub timestamp: Timestamp,
    /// `None` is a tombstone left by `DeleteComponent`.
    pub data: Option<Payload>,
}

impl LwwEntry {
    /// Whether an incoming write at `timestamp` carrying `data` loses.
    ///
    /// Older timestamps lose. On a tie, an exact duplicate loses and
    /// anything else wins, so the later-processed write takes effect.
    fn rejects(&self, timestamp: Timestamp, data: Option<&[u8]>) -> bool {
        match timestamp.cmp(&self.timestamp) {
            std::cmp::Ordering::Less => true,
            std::cmp::Ordering::Equal => self.data.as_deref() == data,
            std::cmp::Ordering::Greater => false,
        }
    }
}

/// Timestamp-ordered log for append-style components.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct AppendLog {
    /// Sorted by timestamp, no duplicates.
    entries: Vec<(Timestamp, Payload)>,
}

impl AppendLog {
    pub fn entries(&self) -> &[(Timestamp, Payload)] {
        &self.entries
    }

    /// Insert in timestamp order, evicting the oldest entry once `cap` is
    /// reached.
    fn insert(
        &mut self,
        timestamp: Timestamp,
        data: Payload,
        cap: usize,
    ) -> Result<(), RejectReason> {
        let pos = match self.entries.binary_search_by_key(&timestamp, |(t, _)| *t) {
            Ok(_) => return Err(RejectReason::Stale),
            Err(pos) => pos,
        };
        if self.entries.len() >= cap {
            // The newcomer would be evicted immediately.
            if pos == 0 {
                return Err(RejectReason::Stale);
            }
            let excess = self.entries.len() + 1 - cap;
            self.entries.drain(..excess);
            self.entries.insert(pos - excess, (timestamp, data));
        } else {
            self.entries.insert(pos, (timestamp, data));
        }
        Ok(())
    }
}

/// All component state owned by one live entity.
#[derive(Clone, Debug, Default)]
pub(crate) struct EntityState {
    pub lww: IndexMap<ComponentId, LwwEntry>,
    pub logs: IndexMap<ComponentId, AppendLog>,
}

impl EntityState {
    pub fn is_empty(&self) -> bool {
        self.lww.is_empty() && self.logs.is_empty()
    }

    pub fn clear(&mut self) {
        self.lww.clear();
        self.logs.clear();
    }

    /// Timestamp stored for `component`, live or tombstoned.
    pub fn timestamp_of(&self, component: ComponentId) -> Option<Timestamp> {
        self.lww.get(&component).map(|e| e.timestamp)
    }

    pub fn put(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        timestamp: Timestamp,
        data: Payload,
    ) -> Result<StateDelta, RejectReason> {
        let was_live = match self.lww.get(&component) {
            Some(old) if old.rejects(timestamp, Some(&data[..])) => {
                return Err(RejectReason::Stale)
            }
            Some(old) => old.data.is_some(),
            None => false,
        };
        self.lww.insert(
            component,
            LwwEntry {
                timestamp,
                data: Some(data.clone()),
            },
        );
        Ok(if was_live {
            StateDelta::ComponentModified {
                entity,
                component,
                timestamp,
                data,
            }
        } else {
            StateDelta::ComponentAdded {
                entity,
                component,
                timestamp,
                data,
            }
        })
    }

    pub fn delete(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        timestamp: Timestamp,
    ) -> Result<StateDelta, RejectReason> {
        let was_live = match self.lww.get(&component) {
            Some(old) if old.rejects(timestamp, None) => return Err(RejectReason::Stale),
            Some(old) => old.data.is_some(),
            None => false,
        };
        self.lww.insert(
            component,
            LwwEntry {
                timestamp,
                data: None,
            },
        );
        Ok(StateDelta::ComponentDeleted {
            entity,
            component,
            timestamp,
            was_live,
        })
    }

    pub fn append(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        timestamp: Timestamp,
        data: Payload,
        cap: usize,
    ) -> Result<StateDelta, RejectReason> {
        self.logs
            .entry(component)
            .or_default()
            .insert(timestamp, data.clone(), cap)?;
        Ok(StateDelta::ValueAppended {
            entity,
            component,
            timestamp,
            data,
        })
    }
}
