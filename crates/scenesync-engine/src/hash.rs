//! State hashing for convergence checks.
//!
//! Uses FNV-1a over the wire encoding of the state snapshot, visited in a
//! canonical order so that two sessions holding the same state hash the
//! same even when their messages arrived in different orders. Not
//! cryptographically secure.

use scenesync_core::{CrdtMessage, MessageType};
use scenesync_wire::encode_into;

use crate::session::Session;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed bytes into an FNV-1a hash state.
#[inline]
fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Sort key independent of arrival order.
fn canonical_key(msg: &CrdtMessage) -> (u32, u32, u32, u32) {
    let rank = match msg.message_type() {
        MessageType::DeleteEntity => 0,
        MessageType::PutComponent | MessageType::DeleteComponent => 1,
        MessageType::AppendValue => 2,
    };
    (
        msg.entity().index,
        msg.component().map_or(0, |c| c.0),
        rank,
        msg.timestamp().map_or(0, |t| t.0),
    )
}

/// Hash of the session's authoritative state.
///
/// Returns `FNV_OFFSET` for an empty session.
pub fn state_hash(session: &Session) -> u64 {
    let mut msgs = session.state_messages();
    msgs.sort_by_key(canonical_key);

    let mut buf = Vec::new();
    msgs.iter().fold(FNV_OFFSET, |hash, msg| {
        buf.clear();
        encode_into(msg, &mut buf);
        fnv1a(hash, &buf)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use scenesync_test_utils::{entity, put};

    fn session_with(index_order: &[u32]) -> Session {
        let mut s = Session::new(EngineConfig::default()).unwrap();
        for &i in index_order {
            s.register_entity(entity((i, 0))).unwrap();
        }
        s
    }

    #[test]
    fn empty_session_hashes_to_offset() {
        assert_eq!(state_hash(&session_with(&[])), FNV_OFFSET);
    }

    #[test]
    fn component_insertion_order_does_not_matter() {
        let mut a = session_with(&[0]);
        a.apply(put((0, 0), 1, 1, b"x"));
        a.apply(put((0, 0), 2, 1, b"y"));

        let mut b = session_with(&[0]);
        b.apply(put((0, 0), 2, 1, b"y"));
        b.apply(put((0, 0), 1, 1, b"x"));

        assert_ne!(a.state_messages(), b.state_messages());
        assert_eq!(state_hash(&a), state_hash(&b));
    }

    #[test]
    fn different_payload_different_hash() {
        let mut a = session_with(&[0]);
        a.apply(put((0, 0), 1, 1, b"x"));
        let mut b = session_with(&[0]);
        b.apply(put((0, 0), 1, 1, b"z"));
        assert_ne!(state_hash(&a), state_hash(&b));
    }
}
