//! Benchmark workloads for the scenesync CRDT core.
//!
//! Provides deterministic message profiles for benchmarking:
//!
//! - [`reference_profile`]: 1K entities, 4 LWW components and one append
//!   log each, several rounds of updates
//! - [`registered_session`]: a session with every profile entity reported
//!   alive

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use scenesync_core::CrdtMessage;
use scenesync_engine::{EngineConfig, Session};
use scenesync_test_utils::{append, delete_component, entity, put, shuffled};

/// Entities in the reference profile.
pub const REFERENCE_ENTITIES: u32 = 1_000;

/// Build a reference workload: `rounds` of updates over
/// [`REFERENCE_ENTITIES`] entities, shuffled with `seed` to mimic
/// out-of-order delivery.
///
/// Each round puts 4 components per entity with a 16-byte payload, deletes
/// one of them every third round, and appends one log entry.
pub fn reference_profile(rounds: u32, seed: u64) -> Vec<CrdtMessage> {
    let mut msgs = Vec::with_capacity((REFERENCE_ENTITIES * rounds * 6) as usize);
    for round in 0..rounds {
        for e in 0..REFERENCE_ENTITIES {
            for c in 0..4u32 {
                let mut payload = [0u8; 16];
                payload[..4].copy_from_slice(&e.to_le_bytes());
                payload[4..8].copy_from_slice(&c.to_le_bytes());
                payload[8..12].copy_from_slice(&round.to_le_bytes());
                msgs.push(put((e, 0), c, round * 2, &payload));
            }
            if round % 3 == 2 {
                msgs.push(delete_component((e, 0), e % 4, round * 2 + 1));
            }
            msgs.push(append((e, 0), 10, round, &round.to_le_bytes()));
        }
    }
    shuffled(seed, &msgs)
}

/// A session with entities `0..REFERENCE_ENTITIES` registered at
/// generation 0.
pub fn registered_session() -> Session {
    let mut session = Session::new(EngineConfig::default()).expect("default config is valid");
    for e in 0..REFERENCE_ENTITIES {
        session
            .register_entity(entity((e, 0)))
            .expect("index within default capacity");
    }
    session
}
