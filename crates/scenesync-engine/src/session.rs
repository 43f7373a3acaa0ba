//! The reconciliation session.
//!
//! A [`Session`] owns the authoritative state table for one scene: the
//! generational entity table, every LWW register and every append log. It
//! is single-writer by construction (`&mut self` on every mutating call);
//! producers on other threads feed it through the
//! [`Ingress`](crate::Ingress) queue.
//!
//! # Per-message rules
//!
//! | Message | Accepted when | Otherwise |
//! |---------|---------------|-----------|
//! | `PutComponent` | entity alive at that generation, `t > t_old`, or `t == t_old` with different data | `EntityDead` / `Stale` |
//! | `DeleteComponent` | same as put; the register becomes a tombstone | `EntityDead` / `Stale` |
//! | `AppendValue` | entity alive, timestamp not yet in the log | `EntityDead` / `Stale` |
//! | `DeleteEntity` | entity alive at that generation | `Stale` |
//!
//! Indices at or above `max_entities` and payloads above
//! `max_payload_len` are `Malformed`.

use scenesync_core::{
    ComponentId, CrdtMessage, EntityId, LifecycleError, Payload, ProcessedMessage, RejectReason,
    StateDelta, Timestamp,
};
use scenesync_wire::{decode_batch_with, SkippedMessage};

use crate::config::{ConfigError, EngineConfig};
use crate::entity::{Admitted, Deletion, EntityTable, SlotState};
use crate::ingress::{Ingress, ProducerId};
use crate::metrics::ReconcileMetrics;

/// What [`Session::receive`] did with one inbound buffer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReceiveReport {
    /// One outcome per decoded message, in buffer order.
    pub outcomes: Vec<ProcessedMessage>,
    /// Length of the consumed prefix. The caller keeps the rest.
    pub bytes_consumed: usize,
    /// Messages the decoder skipped.
    pub skipped: Vec<SkippedMessage>,
}

impl ReceiveReport {
    /// Deltas of the applied messages, in order.
    pub fn applied(&self) -> impl Iterator<Item = &StateDelta> {
        self.outcomes.iter().filter_map(ProcessedMessage::delta)
    }
}

/// Authoritative CRDT state for one scene.
///
/// # Examples
///
/// ```
/// use scenesync_core::{ComponentId, CrdtMessage, EntityId, RejectReason, Timestamp};
/// use scenesync_engine::{EngineConfig, Session};
///
/// let mut session = Session::new(EngineConfig::default()).unwrap();
/// let e = EntityId::new(3, 1);
/// session.register_entity(e).unwrap();
///
/// let put = |t, data: &[u8]| CrdtMessage::PutComponent {
///     entity: e,
///     component: ComponentId(7),
///     timestamp: Timestamp(t),
///     data: data.into(),
/// };
/// assert!(session.apply(put(10, b"A")).is_applied());
/// assert_eq!(session.apply(put(5, b"B")).reject_reason(), Some(RejectReason::Stale));
/// assert!(session.apply(put(10, b"C")).is_applied());
/// assert_eq!(session.component(e, ComponentId(7)), Some(&b"C"[..]));
/// ```
pub struct Session {
    config: EngineConfig,
    entities: EntityTable,
    metrics: ReconcileMetrics,
}

impl Session {
    /// Create an empty session.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let entities = EntityTable::new(config.max_entities, config.entity_admission);
        Ok(Self {
            config,
            entities,
            metrics: ReconcileMetrics::default(),
        })
    }

    /// The configuration this session was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cumulative counters.
    pub fn metrics(&self) -> ReconcileMetrics {
        self.metrics
    }

    // ── Reconciliation ─────────────────────────────────────────────

    /// Reconcile one message against the state table.
    ///
    /// Under [`EntityAdmission::Implicit`](crate::EntityAdmission) a newer
    /// generation evicts the slot's live occupant; the outcome names it in
    /// `superseded` so live storage can drop it too.
    pub fn apply(&mut self, msg: CrdtMessage) -> ProcessedMessage {
        let entity = msg.entity();
        let outcome = match self.reconcile(msg) {
            Ok((delta, superseded)) => {
                if let Some(old) = superseded {
                    tracing::debug!(entity = %entity, superseded = %old, "entity superseded");
                }
                ProcessedMessage::Applied { delta, superseded }
            }
            Err(reason) => {
                tracing::trace!(entity = %entity, %reason, "message rejected");
                ProcessedMessage::Rejected(reason)
            }
        };
        self.metrics.record(&outcome);
        outcome
    }

    fn reconcile(
        &mut self,
        msg: CrdtMessage,
    ) -> Result<(StateDelta, Option<EntityId>), RejectReason> {
        if msg.data().is_some_and(|d| d.len() > self.config.max_payload_len) {
            return Err(RejectReason::Malformed);
        }
        let cap = self.config.max_append_entries;
        match msg {
            CrdtMessage::DeleteEntity { entity } => {
                let superseded = match self.entities.delete(entity)? {
                    Deletion::Killed => None,
                    Deletion::Recorded { superseded } => superseded,
                };
                Ok((StateDelta::EntityDeleted { entity }, superseded))
            }
            CrdtMessage::PutComponent {
                entity,
                component,
                timestamp,
                data,
            } => {
                let Admitted { state, superseded } = self.entities.admit(entity)?;
                Ok((state.put(entity, component, timestamp, data)?, superseded))
            }
            CrdtMessage::DeleteComponent {
                entity,
                component,
                timestamp,
            } => {
                let Admitted { state, superseded } = self.entities.admit(entity)?;
                Ok((state.delete(entity, component, timestamp)?, superseded))
            }
            CrdtMessage::AppendValue {
                entity,
                component,
                timestamp,
                data,
            } => {
                let Admitted { state, superseded } = self.entities.admit(entity)?;
                Ok((
                    state.append(entity, component, timestamp, data, cap)?,
                    superseded,
                ))
            }
        }
    }

    /// Decode `bytes` and reconcile every message, in order.
    ///
    /// A trailing partial message is left unconsumed; see
    /// [`ReceiveReport::bytes_consumed`].
    pub fn receive(&mut self, bytes: &[u8]) -> ReceiveReport {
        let batch = decode_batch_with(bytes, &self.config.decode);
        self.metrics.messages_decoded += batch.messages.len() as u64;
        self.metrics.decode_skipped += batch.skipped.len() as u64;
        self.metrics.bytes_consumed += batch.bytes_consumed as u64;

        let outcomes = batch.messages.into_iter().map(|m| self.apply(m)).collect();
        ReceiveReport {
            outcomes,
            bytes_consumed: batch.bytes_consumed,
            skipped: batch.skipped,
        }
    }

    /// Drain the ingress queue and reconcile each batch in arrival order.
    ///
    /// Every queued batch is one complete buffer from one producer; any
    /// partial tail in it is dropped with a warning.
    pub fn receive_pending(&mut self, ingress: &Ingress) -> Vec<(ProducerId, ReceiveReport)> {
        ingress
            .drain()
            .into_iter()
            .map(|batch| {
                let report = self.receive(&batch.bytes);
                let leftover = batch.bytes.len() - report.bytes_consumed;
                if leftover > 0 {
                    tracing::warn!(
                        producer = batch.producer,
                        leftover,
                        "dropping incomplete message at end of inbound batch"
                    );
                }
                (batch.producer, report)
            })
            .collect()
    }

    // ── Entity lifecycle ───────────────────────────────────────────

    /// Report an entity generation created by the lifecycle owner.
    ///
    /// Must happen before messages for that generation are processed.
    /// A newer generation recycles the slot and drops whatever state the
    /// old occupant left behind.
    pub fn register_entity(&mut self, entity: EntityId) -> Result<(), LifecycleError> {
        self.entities.register(entity)
    }

    /// Whether `entity` is alive at exactly that generation.
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.is_alive(entity)
    }

    /// Current generation of a slot, alive or dead. `None` if never seen.
    pub fn generation_of(&self, index: u32) -> Option<u32> {
        self.entities.generation_of(index)
    }

    /// Number of alive entities.
    pub fn alive_entities(&self) -> usize {
        self.entities.alive_count()
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Live payload of an LWW component. `None` if absent or deleted.
    pub fn component(&self, entity: EntityId, component: ComponentId) -> Option<&[u8]> {
        self.entities
            .state(entity)?
            .lww
            .get(&component)?
            .data
            .as_deref()
    }

    /// Timestamp stored for an LWW component, including tombstones.
    pub fn timestamp_of(&self, entity: EntityId, component: ComponentId) -> Option<Timestamp> {
        self.entities.state(entity)?.timestamp_of(component)
    }

    /// Entries of an append log in timestamp order.
    pub fn append_log(&self, entity: EntityId, component: ComponentId) -> Vec<(Timestamp, &[u8])> {
        self.entities
            .state(entity)
            .and_then(|s| s.logs.get(&component))
            .map(|log| log.entries().iter().map(|(t, d)| (*t, &d[..])).collect())
            .unwrap_or_default()
    }

    // ── Local messages ─────────────────────────────────────────────

    /// Timestamp for the next local write to an LWW register.
    fn next_timestamp(&self, entity: EntityId, component: ComponentId) -> Timestamp {
        self.timestamp_of(entity, component)
            .map_or(Timestamp(0), Timestamp::next)
    }

    /// Apply a locally produced message and hand it back for sending.
    fn commit_local(&mut self, msg: CrdtMessage) -> Result<CrdtMessage, RejectReason> {
        match self.apply(msg.clone()) {
            ProcessedMessage::Applied { .. } => Ok(msg),
            ProcessedMessage::Rejected(reason) => Err(reason),
        }
    }

    /// Write a component locally. Returns the message to broadcast.
    pub fn put_local(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        data: impl Into<Payload>,
    ) -> Result<CrdtMessage, RejectReason> {
        let timestamp = self.next_timestamp(entity, component);
        self.commit_local(CrdtMessage::PutComponent {
            entity,
            component,
            timestamp,
            data: data.into(),
        })
    }

    /// Delete a component locally. Returns the message to broadcast.
    pub fn delete_component_local(
        &mut self,
        entity: EntityId,
        component: ComponentId,
    ) -> Result<CrdtMessage, RejectReason> {
        let timestamp = self.next_timestamp(entity, component);
        self.commit_local(CrdtMessage::DeleteComponent {
            entity,
            component,
            timestamp,
        })
    }

    /// Append to a log component locally. Returns the message to broadcast.
    pub fn append_local(
        &mut self,
        entity: EntityId,
        component: ComponentId,
        timestamp: Timestamp,
        data: impl Into<Payload>,
    ) -> Result<CrdtMessage, RejectReason> {
        self.commit_local(CrdtMessage::AppendValue {
            entity,
            component,
            timestamp,
            data: data.into(),
        })
    }

    /// Delete an entity locally. Returns the message to broadcast.
    pub fn delete_entity_local(&mut self, entity: EntityId) -> Result<CrdtMessage, RejectReason> {
        self.commit_local(CrdtMessage::DeleteEntity { entity })
    }

    // ── Snapshot ───────────────────────────────────────────────────

    /// The current state expressed as messages, for a late-joining peer.
    ///
    /// Dead entities come out as `DeleteEntity`, registers as
    /// `PutComponent` or (tombstones) `DeleteComponent`, logs as
    /// `AppendValue` in timestamp order. Entities are visited by index,
    /// components in first-seen order.
    pub fn state_messages(&self) -> Vec<CrdtMessage> {
        let mut out = Vec::with_capacity(self.message_count());
        for (index, slot) in self.entities.slots() {
            let entity = EntityId::new(index, slot.generation);
            match slot.state {
                SlotState::Vacant => {}
                SlotState::Dead => out.push(CrdtMessage::DeleteEntity { entity }),
                SlotState::Alive => {
                    for (&component, entry) in &slot.components.lww {
                        out.push(match &entry.data {
                            Some(data) => CrdtMessage::PutComponent {
                                entity,
                                component,
                                timestamp: entry.timestamp,
                                data: data.clone(),
                            },
                            None => CrdtMessage::DeleteComponent {
                                entity,
                                component,
                                timestamp: entry.timestamp,
                            },
                        });
                    }
                    for (&component, log) in &slot.components.logs {
                        out.extend(log.entries().iter().map(|(timestamp, data)| {
                            CrdtMessage::AppendValue {
                                entity,
                                component,
                                timestamp: *timestamp,
                                data: data.clone(),
                            }
                        }));
                    }
                }
            }
        }
        out
    }

    /// Number of messages [`state_messages`](Self::state_messages) returns.
    pub fn message_count(&self) -> usize {
        self.entities
            .slots()
            .map(|(_, slot)| match slot.state {
                SlotState::Vacant => 0,
                SlotState::Dead => 1,
                SlotState::Alive => {
                    slot.components.lww.len()
                        + slot
                            .components
                            .logs
                            .values()
                            .map(|l| l.entries().len())
                            .sum::<usize>()
                }
            })
            .sum()
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        tracing::debug!(
            alive = self.entities.alive_count(),
            applied = self.metrics.applied,
            rejected = self.metrics.rejected(),
            "session dropped"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntityAdmission;
    use scenesync_core::ReconciliationEffect;
    use scenesync_test_utils::{append, delete_component, delete_entity, entity, put};
    use scenesync_wire::encode_batch;

    const C7: ComponentId = ComponentId(7);

    fn session() -> Session {
        Session::new(EngineConfig::default()).unwrap()
    }

    fn implicit() -> Session {
        Session::new(EngineConfig {
            entity_admission: EntityAdmission::Implicit,
            ..EngineConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn invalid_config_is_refused() {
        let cfg = EngineConfig {
            max_entities: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(Session::new(cfg), Err(ConfigError::NoEntities)));
    }

    #[test]
    fn lww_scenario_equal_timestamp_recency() {
        let mut s = session();
        let e = entity((3, 1));
        s.register_entity(e).unwrap();

        let outcomes: Vec<_> = [
            put((3, 1), 7, 10, b"A"),
            put((3, 1), 7, 5, b"B"),
            put((3, 1), 7, 10, b"C"),
        ]
        .into_iter()
        .map(|m| s.apply(m))
        .collect();

        assert!(outcomes[0].is_applied());
        assert_eq!(outcomes[1].reject_reason(), Some(RejectReason::Stale));
        assert_eq!(outcomes[2].effect(), ReconciliationEffect::ComponentModified);
        assert_eq!(s.component(e, C7), Some(&b"C"[..]));
        assert_eq!(s.timestamp_of(e, C7), Some(Timestamp(10)));
    }

    #[test]
    fn delete_entity_then_recycle_scenario() {
        let mut s = session();
        s.register_entity(entity((3, 1))).unwrap();

        assert_eq!(
            s.apply(delete_entity((3, 1))).effect(),
            ReconciliationEffect::EntityDeleted
        );
        assert_eq!(
            s.apply(put((3, 1), 7, 99, b"X")).reject_reason(),
            Some(RejectReason::EntityDead)
        );

        s.register_entity(entity((3, 2))).unwrap();
        assert!(s.apply(put((3, 2), 7, 0, b"Y")).is_applied());
        assert_eq!(s.component(entity((3, 2)), C7), Some(&b"Y"[..]));
        assert_eq!(s.generation_of(3), Some(2));
    }

    #[test]
    fn implicit_recycle_names_superseded_occupant() {
        let mut s = implicit();
        assert_eq!(s.apply(put((4, 0), 7, 1, b"a")).superseded(), None);
        assert_eq!(s.apply(put((4, 0), 7, 2, b"b")).superseded(), None);

        let outcome = s.apply(append((4, 2), 8, 0, b"e"));
        assert!(outcome.is_applied());
        assert_eq!(outcome.superseded(), Some(entity((4, 0))));
        assert_eq!(s.alive_entities(), 1);

        let outcome = s.apply(delete_entity((4, 5)));
        assert_eq!(outcome.superseded(), Some(entity((4, 2))));
        // A second eviction of an already dead slot names nobody.
        assert_eq!(s.apply(delete_entity((4, 6))).superseded(), None);
    }

    #[test]
    fn repeated_delete_entity_is_stale() {
        let mut s = session();
        s.register_entity(entity((1, 1))).unwrap();
        assert!(s.apply(delete_entity((1, 1))).is_applied());
        assert_eq!(
            s.apply(delete_entity((1, 1))).reject_reason(),
            Some(RejectReason::Stale)
        );
    }

    #[test]
    fn delete_entity_clears_components() {
        let mut s = session();
        let e = entity((1, 1));
        s.register_entity(e).unwrap();
        s.apply(put((1, 1), 1, 1, b"a"));
        s.apply(append((1, 1), 2, 1, b"b"));
        s.apply(delete_entity((1, 1)));
        s.register_entity(entity((1, 2))).unwrap();

        assert_eq!(s.component(entity((1, 2)), ComponentId(1)), None);
        assert!(s.append_log(entity((1, 2)), ComponentId(2)).is_empty());
    }

    #[test]
    fn unregistered_entity_is_dead_in_strict_mode() {
        let mut s = session();
        assert_eq!(
            s.apply(put((5, 0), 1, 1, b"x")).reject_reason(),
            Some(RejectReason::EntityDead)
        );
    }

    #[test]
    fn unknown_component_ids_are_still_applied() {
        let mut s = session();
        s.register_entity(entity((0, 0))).unwrap();
        assert!(s.apply(put((0, 0), u32::MAX, 1, b"?")).is_applied());
    }

    #[test]
    fn bounds_are_malformed() {
        let mut s = Session::new(EngineConfig {
            max_entities: 8,
            max_payload_len: 4,
            ..EngineConfig::default()
        })
        .unwrap();
        s.register_entity(entity((0, 0))).unwrap();

        assert_eq!(
            s.apply(put((8, 0), 1, 1, b"x")).reject_reason(),
            Some(RejectReason::Malformed)
        );
        assert_eq!(
            s.apply(put((0, 0), 1, 1, b"12345")).reject_reason(),
            Some(RejectReason::Malformed)
        );
        assert!(s.apply(put((0, 0), 1, 1, b"1234")).is_applied());
        assert_eq!(s.metrics().malformed, 2);
    }

    #[test]
    fn append_log_accumulates_in_timestamp_order() {
        let mut s = session();
        let e = entity((2, 0));
        s.register_entity(e).unwrap();
        for (t, d) in [(3, b"c"), (1, b"a"), (2, b"b")] {
            assert!(s.apply(append((2, 0), 4, t, d)).is_applied());
        }
        assert_eq!(
            s.apply(append((2, 0), 4, 2, b"b")).reject_reason(),
            Some(RejectReason::Stale)
        );
        let log = s.append_log(e, ComponentId(4));
        assert_eq!(
            log,
            vec![
                (Timestamp(1), &b"a"[..]),
                (Timestamp(2), &b"b"[..]),
                (Timestamp(3), &b"c"[..])
            ]
        );
    }

    #[test]
    fn append_log_is_capped() {
        let mut s = Session::new(EngineConfig {
            max_append_entries: 2,
            ..EngineConfig::default()
        })
        .unwrap();
        let e = entity((0, 0));
        s.register_entity(e).unwrap();
        for t in 1..=3 {
            s.apply(append((0, 0), 1, t, b"v"));
        }
        let ts: Vec<u32> = s
            .append_log(e, ComponentId(1))
            .into_iter()
            .map(|(t, _)| t.0)
            .collect();
        assert_eq!(ts, vec![2, 3]);
        assert_eq!(
            s.apply(append((0, 0), 1, 1, b"v")).reject_reason(),
            Some(RejectReason::Stale)
        );
    }

    #[test]
    fn receive_decodes_and_applies_in_order() {
        let mut s = session();
        s.register_entity(entity((3, 1))).unwrap();
        let mut bytes = encode_batch(&[
            put((3, 1), 7, 10, b"A"),
            put((3, 1), 7, 5, b"B"),
            delete_component((3, 1), 7, 11),
        ]);
        let full = bytes.len();
        bytes.extend_from_slice(&[40, 0, 0]);

        let report = s.receive(&bytes);
        assert_eq!(report.bytes_consumed, full);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.applied().count(), 2);
        assert_eq!(s.component(entity((3, 1)), C7), None);

        let m = s.metrics();
        assert_eq!(m.messages_decoded, 3);
        assert_eq!(m.applied, 2);
        assert_eq!(m.stale, 1);
        assert_eq!(m.bytes_consumed, full as u64);
    }

    #[test]
    fn local_writes_bump_timestamps() {
        let mut s = session();
        let e = entity((0, 1));
        s.register_entity(e).unwrap();

        let first = s.put_local(e, C7, &b"a"[..]).unwrap();
        assert_eq!(first.timestamp(), Some(Timestamp(0)));
        let second = s.put_local(e, C7, &b"b"[..]).unwrap();
        assert_eq!(second.timestamp(), Some(Timestamp(1)));

        // A remote write moves the register forward; local follows it.
        s.apply(put((0, 1), 7, 40, b"remote"));
        let del = s.delete_component_local(e, C7).unwrap();
        assert_eq!(del.timestamp(), Some(Timestamp(41)));
        assert_eq!(s.component(e, C7), None);

        let app = s.append_local(e, ComponentId(9), Timestamp(3), &b"evt"[..]).unwrap();
        assert_eq!(app, append((0, 1), 9, 3, b"evt"));

        assert_eq!(s.delete_entity_local(e), Ok(delete_entity((0, 1))));
        assert_eq!(
            s.put_local(e, C7, &b"late"[..]),
            Err(RejectReason::EntityDead)
        );
    }

    #[test]
    fn snapshot_lists_dead_entities_tombstones_and_logs() {
        let mut s = session();
        s.register_entity(entity((0, 0))).unwrap();
        s.register_entity(entity((2, 4))).unwrap();
        s.register_entity(entity((1, 1))).unwrap();

        s.apply(put((0, 0), 5, 3, b"p"));
        s.apply(put((0, 0), 6, 1, b"q"));
        s.apply(delete_component((0, 0), 6, 2));
        s.apply(append((0, 0), 8, 9, b"z"));
        s.apply(append((0, 0), 8, 4, b"y"));
        s.apply(delete_entity((2, 4)));

        let msgs = s.state_messages();
        assert_eq!(
            msgs,
            vec![
                put((0, 0), 5, 3, b"p"),
                delete_component((0, 0), 6, 2),
                append((0, 0), 8, 4, b"y"),
                append((0, 0), 8, 9, b"z"),
                delete_entity((2, 4)),
            ]
        );
        assert_eq!(s.message_count(), msgs.len());
    }

    #[test]
    fn snapshot_rebuilds_state_in_implicit_session() {
        let mut s = session();
        s.register_entity(entity((0, 0))).unwrap();
        s.register_entity(entity((1, 3))).unwrap();
        s.apply(put((0, 0), 1, 7, b"seven"));
        s.apply(append((0, 0), 2, 1, b"e1"));
        s.apply(delete_entity((1, 3)));

        let mut late = implicit();
        let report = late.receive(&encode_batch(&s.state_messages()));
        assert!(report.outcomes.iter().all(ProcessedMessage::is_applied));
        assert_eq!(late.state_messages(), s.state_messages());
        assert_eq!(late.generation_of(1), Some(3));
        assert!(!late.is_alive(entity((1, 3))));
    }
}
