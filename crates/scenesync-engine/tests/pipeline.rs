//! End-to-end flows: producers → ingress → session → sync buffer →
//! storage, and peer-to-peer relay through the wire format.

use std::thread;

use scenesync_core::{ComponentId, CrdtMessage, ProcessedMessage, RejectReason, Timestamp};
use scenesync_engine::{
    state_hash, EngineConfig, EntityAdmission, InboundBatch, Ingress, Session, SyncBuffer,
};
use scenesync_test_utils::{
    append, delete_component, delete_entity, entity, put, RecordingStorage, StorageOp,
};
use scenesync_wire::{encode_batch, BatchWriter, StreamReader};

fn registered(indices: &[(u32, u32)]) -> Session {
    let mut s = Session::new(EngineConfig::default()).unwrap();
    for &e in indices {
        s.register_entity(entity(e)).unwrap();
    }
    s
}

#[test]
fn applied_deltas_reach_storage_once_per_tick() {
    let mut session = registered(&[(0, 0), (1, 0)]);
    let mut buffer = SyncBuffer::new();
    let mut storage = RecordingStorage::new();

    let tick = encode_batch(&[
        put((0, 0), 1, 1, b"a"),
        put((0, 0), 1, 2, b"b"),
        put((0, 0), 1, 1, b"stale"),
        put((1, 0), 1, 1, b"gone"),
        delete_component((1, 0), 1, 2),
        append((0, 0), 2, 5, b"e5"),
        append((0, 0), 2, 4, b"e4"),
    ]);
    let report = session.receive(&tick);
    for outcome in &report.outcomes {
        buffer.record(outcome);
    }
    let stats = buffer.flush(&mut storage);

    // Entity 1's component was added and deleted inside the tick.
    assert_eq!(stats.upserted, 1);
    assert_eq!(stats.removed_components, 0);
    assert_eq!(stats.appended, 2);
    assert_eq!(storage.get(entity((0, 0)), ComponentId(1)), Some(&b"b"[..]));
    assert_eq!(storage.get(entity((1, 0)), ComponentId(1)), None);

    // Next tick removes the entity.
    let report = session.receive(&encode_batch(&[delete_entity((0, 0))]));
    report.outcomes.iter().for_each(|o| buffer.record(o));
    buffer.flush(&mut storage);
    assert_eq!(
        storage.ops.last(),
        Some(&StorageOp::RemoveEntity(entity((0, 0))))
    );
    assert!(storage.live.is_empty());
}

fn implicit() -> Session {
    Session::new(EngineConfig {
        entity_admission: EntityAdmission::Implicit,
        ..EngineConfig::default()
    })
    .unwrap()
}

/// Apply one tick of messages and flush its net effect to `storage`.
fn tick(
    session: &mut Session,
    buffer: &mut SyncBuffer,
    storage: &mut RecordingStorage,
    msgs: &[CrdtMessage],
) -> Vec<ProcessedMessage> {
    let outcomes: Vec<_> = msgs.iter().cloned().map(|m| session.apply(m)).collect();
    outcomes.iter().for_each(|o| buffer.record(o));
    buffer.flush(storage);
    outcomes
}

#[test]
fn implicit_recycle_removes_previous_occupant_from_storage() {
    let mut session = implicit();
    let mut buffer = SyncBuffer::new();
    let mut storage = RecordingStorage::new();

    tick(&mut session, &mut buffer, &mut storage, &[put((1, 0), 5, 1, b"old")]);
    assert_eq!(storage.get(entity((1, 0)), ComponentId(5)), Some(&b"old"[..]));

    let outcomes = tick(&mut session, &mut buffer, &mut storage, &[put((1, 3), 5, 1, b"new")]);
    assert_eq!(outcomes[0].superseded(), Some(entity((1, 0))));

    assert_eq!(session.component(entity((1, 0)), ComponentId(5)), None);
    assert_eq!(storage.get(entity((1, 0)), ComponentId(5)), None);
    assert_eq!(storage.get(entity((1, 3)), ComponentId(5)), Some(&b"new"[..]));
}

#[test]
fn implicit_delete_of_newer_generation_removes_live_occupant() {
    let mut session = implicit();
    let mut buffer = SyncBuffer::new();
    let mut storage = RecordingStorage::new();

    tick(&mut session, &mut buffer, &mut storage, &[put((2, 0), 5, 1, b"old")]);
    let outcomes = tick(&mut session, &mut buffer, &mut storage, &[delete_entity((2, 4))]);
    assert_eq!(outcomes[0].superseded(), Some(entity((2, 0))));

    assert!(storage.live.is_empty());
    assert!(storage
        .ops
        .contains(&StorageOp::RemoveEntity(entity((2, 0)))));
    assert_eq!(session.alive_entities(), 0);
}

#[test]
fn producers_merge_through_ingress() {
    let config = EngineConfig {
        ingress_capacity: 128,
        ..EngineConfig::default()
    };
    let ingress = Ingress::from_config(&config);
    let mut session = Session::new(config).unwrap();
    for p in 0..4u32 {
        session.register_entity(entity((p, 0))).unwrap();
    }

    let handles: Vec<_> = (0..4u32)
        .map(|p| {
            let tx = ingress.sender();
            thread::spawn(move || {
                for t in 0..10u32 {
                    let bytes = encode_batch(&[put((p, 0), 0, t, &t.to_le_bytes())]);
                    tx.try_submit(InboundBatch { producer: p, bytes }).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let reports = session.receive_pending(&ingress);
    assert_eq!(reports.len(), 40);
    assert!(reports
        .iter()
        .all(|(_, r)| r.outcomes.iter().all(ProcessedMessage::is_applied)));
    for p in 0..4u32 {
        assert_eq!(
            session.component(entity((p, 0)), ComponentId(0)),
            Some(&9u32.to_le_bytes()[..])
        );
    }
    assert_eq!(session.metrics().applied, 40);
}

#[test]
fn local_writes_relay_to_peer() {
    let mut a = registered(&[(7, 2)]);
    let mut b = registered(&[(7, 2)]);
    let e = entity((7, 2));

    let mut out = BatchWriter::new();
    out.push(&a.put_local(e, ComponentId(1), &b"hello"[..]).unwrap());
    out.push(&a.put_local(e, ComponentId(1), &b"world"[..]).unwrap());
    out.push(&a.append_local(e, ComponentId(2), Timestamp(0), &b"log"[..]).unwrap());
    out.push(&a.delete_component_local(e, ComponentId(3)).unwrap());
    let bytes = out.finish();

    // Deliver in awkward chunks.
    let mut reader = StreamReader::new();
    for chunk in bytes.chunks(5) {
        reader.push(chunk);
        for msg in reader.poll().messages {
            assert!(b.apply(msg).is_applied());
        }
    }

    assert_eq!(b.component(e, ComponentId(1)), Some(&b"world"[..]));
    assert_eq!(b.timestamp_of(e, ComponentId(1)), Some(Timestamp(1)));
    assert_eq!(state_hash(&a), state_hash(&b));
}

#[test]
fn lww_and_recycle_scenarios_over_the_wire() {
    let mut s = registered(&[(3, 1)]);

    let report = s.receive(&encode_batch(&[
        put((3, 1), 7, 10, b"A"),
        put((3, 1), 7, 5, b"B"),
        put((3, 1), 7, 10, b"C"),
    ]));
    assert_eq!(
        report
            .outcomes
            .iter()
            .map(ProcessedMessage::reject_reason)
            .collect::<Vec<_>>(),
        vec![None, Some(RejectReason::Stale), None]
    );
    assert_eq!(s.component(entity((3, 1)), ComponentId(7)), Some(&b"C"[..]));

    let report = s.receive(&encode_batch(&[
        delete_entity((3, 1)),
        put((3, 1), 7, 99, b"X"),
    ]));
    assert!(report.outcomes[0].is_applied());
    assert_eq!(
        report.outcomes[1].reject_reason(),
        Some(RejectReason::EntityDead)
    );

    s.register_entity(entity((3, 2))).unwrap();
    let report = s.receive(&encode_batch(&[put((3, 2), 7, 0, b"Y")]));
    assert!(report.outcomes[0].is_applied());
}

#[test]
fn late_joiner_catches_up_from_snapshot() {
    let mut host = registered(&[(0, 0), (1, 0), (2, 5)]);
    host.receive(&encode_batch(&[
        put((0, 0), 1, 3, b"pos"),
        put((1, 0), 1, 1, b"rot"),
        delete_component((1, 0), 1, 2),
        append((0, 0), 9, 1, b"chat"),
        delete_entity((2, 5)),
    ]));

    let mut late = Session::new(EngineConfig {
        entity_admission: EntityAdmission::Implicit,
        ..EngineConfig::default()
    })
    .unwrap();
    let snapshot = encode_batch(&host.state_messages());
    let report = late.receive(&snapshot);

    assert_eq!(report.outcomes.len(), host.message_count());
    assert_eq!(state_hash(&late), state_hash(&host));
    // Old updates for the dead entity stay out.
    assert_eq!(
        late.apply(put((2, 5), 1, 50, b"ghost")).reject_reason(),
        Some(RejectReason::EntityDead)
    );
}
