//! Test utilities for scenesync development.
//!
//! Provides terse message builders, a [`RecordingStorage`] mock of the
//! host's component storage, and [`shuffled`] for reproducible delivery
//! reordering in property tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{RecordingStorage, StorageOp};

use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use scenesync_core::{ComponentId, CrdtMessage, EntityId, Payload, Timestamp};

/// `EntityId` from an `(index, generation)` pair.
pub fn entity((index, generation): (u32, u32)) -> EntityId {
    EntityId::new(index, generation)
}

pub fn put(e: (u32, u32), component: u32, timestamp: u32, data: &[u8]) -> CrdtMessage {
    CrdtMessage::PutComponent {
        entity: entity(e),
        component: ComponentId(component),
        timestamp: Timestamp(timestamp),
        data: Payload::from(data),
    }
}

pub fn delete_component(e: (u32, u32), component: u32, timestamp: u32) -> CrdtMessage {
    CrdtMessage::DeleteComponent {
        entity: entity(e),
        component: ComponentId(component),
        timestamp: Timestamp(timestamp),
    }
}

pub fn delete_entity(e: (u32, u32)) -> CrdtMessage {
    CrdtMessage::DeleteEntity { entity: entity(e) }
}

pub fn append(e: (u32, u32), component: u32, timestamp: u32, data: &[u8]) -> CrdtMessage {
    CrdtMessage::AppendValue {
        entity: entity(e),
        component: ComponentId(component),
        timestamp: Timestamp(timestamp),
        data: Payload::from(data),
    }
}

/// A seeded permutation of `items`.
///
/// Same seed, same order, on every platform.
pub fn shuffled<T: Clone>(seed: u64, items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for i in (1..out.len()).rev() {
        let j = (rng.next_u64() % (i as u64 + 1)) as usize;
        out.swap(i, j);
    }
    out
}
