//! Convergence properties: delivery order and duplicate delivery do not
//! change the reconciled state.

use proptest::prelude::*;
use scenesync_core::{ComponentId, CrdtMessage, ProcessedMessage, RejectReason};
use scenesync_engine::{state_hash, EngineConfig, Session};
use scenesync_test_utils::{append, delete_component, delete_entity, entity, put, shuffled};

const ENTITIES: u32 = 3;

fn fresh() -> Session {
    let mut s = Session::new(EngineConfig {
        max_append_entries: 4,
        ..EngineConfig::default()
    })
    .unwrap();
    for i in 0..ENTITIES {
        s.register_entity(entity((i, 1))).unwrap();
    }
    s
}

#[derive(Clone, Debug)]
enum Op {
    Put(u32, u32, u8),
    Delete(u32, u32),
    Append(u32, u32, u8),
    Kill(u32),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..ENTITIES, 0..3u32, any::<u8>()).prop_map(|(e, c, d)| Op::Put(e, c, d)),
        2 => (0..ENTITIES, 0..3u32).prop_map(|(e, c)| Op::Delete(e, c)),
        3 => (0..ENTITIES, 3..5u32, any::<u8>()).prop_map(|(e, c, d)| Op::Append(e, c, d)),
        1 => (0..ENTITIES).prop_map(Op::Kill),
    ]
}

/// Messages with a distinct timestamp per write, so no two writes to
/// one key tie.
fn to_messages(ops: &[Op]) -> Vec<CrdtMessage> {
    ops.iter()
        .zip(0u32..)
        .map(|(op, t)| match *op {
            Op::Put(e, c, d) => put((e, 1), c, t, &[d]),
            Op::Delete(e, c) => delete_component((e, 1), c, t),
            Op::Append(e, c, d) => append((e, 1), c, t, &[d]),
            Op::Kill(e) => delete_entity((e, 1)),
        })
        .collect()
}

fn apply_all(session: &mut Session, msgs: &[CrdtMessage]) -> Vec<ProcessedMessage> {
    msgs.iter().cloned().map(|m| session.apply(m)).collect()
}

proptest! {
    #[test]
    fn reordering_converges(ops in prop::collection::vec(arb_op(), 0..60), seed in any::<u64>()) {
        let msgs = to_messages(&ops);

        let mut in_order = fresh();
        apply_all(&mut in_order, &msgs);

        let mut reordered = fresh();
        apply_all(&mut reordered, &shuffled(seed, &msgs));

        prop_assert_eq!(state_hash(&in_order), state_hash(&reordered));
        for i in 0..ENTITIES {
            let e = entity((i, 1));
            prop_assert_eq!(in_order.is_alive(e), reordered.is_alive(e));
            for c in 0..5 {
                prop_assert_eq!(
                    in_order.component(e, ComponentId(c)),
                    reordered.component(e, ComponentId(c))
                );
                prop_assert_eq!(
                    in_order.append_log(e, ComponentId(c)),
                    reordered.append_log(e, ComponentId(c))
                );
            }
        }
    }

    #[test]
    fn redelivery_is_idempotent(ops in prop::collection::vec(arb_op(), 0..60)) {
        let msgs = to_messages(&ops);
        let mut s = fresh();
        apply_all(&mut s, &msgs);
        let before = state_hash(&s);

        for outcome in apply_all(&mut s, &msgs) {
            prop_assert!(matches!(
                outcome,
                ProcessedMessage::Rejected(RejectReason::Stale | RejectReason::EntityDead)
            ));
        }
        prop_assert_eq!(state_hash(&s), before);
    }

    #[test]
    fn highest_timestamp_put_wins(
        payloads in prop::collection::vec(any::<u8>(), 1..20),
        seed in any::<u64>(),
    ) {
        let msgs: Vec<_> = payloads
            .iter()
            .zip(0u32..)
            .map(|(&d, t)| put((0, 1), 9, t * 2, &[d]))
            .collect();
        let last = *payloads.last().unwrap();

        let mut s = fresh();
        apply_all(&mut s, &shuffled(seed, &msgs));
        prop_assert_eq!(s.component(entity((0, 1)), ComponentId(9)), Some(&[last][..]));
    }
}

#[test]
fn snapshot_replay_matches_source_hash() {
    let msgs = to_messages(&[
        Op::Put(0, 0, 1),
        Op::Append(0, 3, 2),
        Op::Delete(0, 1),
        Op::Put(1, 2, 3),
        Op::Kill(2),
    ]);
    let mut source = fresh();
    apply_all(&mut source, &msgs);

    let mut late = Session::new(EngineConfig {
        entity_admission: scenesync_engine::EntityAdmission::Implicit,
        ..EngineConfig::default()
    })
    .unwrap();
    apply_all(&mut late, &source.state_messages());

    assert_eq!(state_hash(&late), state_hash(&source));
}
