//! scenesync: CRDT synchronization of entity/component state.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! scenesync sub-crates. For most users, adding `scenesync` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use scenesync::prelude::*;
//!
//! // The host reports entity lifecycles; peers send encoded batches.
//! let mut local = Session::new(EngineConfig::default()).unwrap();
//! let mut remote = Session::new(EngineConfig::default()).unwrap();
//! let player = EntityId::new(3, 1);
//! local.register_entity(player).unwrap();
//! remote.register_entity(player).unwrap();
//!
//! // Local writes get the next timestamp and come back ready to send.
//! let mut out = BatchWriter::new();
//! out.push(&local.put_local(player, ComponentId(7), &b"pos=1,2"[..]).unwrap());
//! let bytes = out.finish();
//!
//! // The remote side decodes, reconciles and forwards net changes to storage.
//! let report = remote.receive(&bytes);
//! let mut tick = SyncBuffer::new();
//! report.outcomes.iter().for_each(|o| tick.record(o));
//! assert!(!tick.is_empty());
//!
//! assert_eq!(remote.component(player, ComponentId(7)), Some(&b"pos=1,2"[..]));
//! assert_eq!(state_hash(&local), state_hash(&remote));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `scenesync-core` | IDs, messages, outcomes, errors, storage trait |
//! | [`wire`] | `scenesync-wire` | Encoder, decoder, stream reader, batch writer |
//! | [`engine`] | `scenesync-engine` | Session, ingress queue, sync buffer, hashing |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`scenesync-core`).
///
/// Contains the message model, reconciliation outcomes, error types, and
/// the [`types::ComponentStorage`] trait the host implements.
pub use scenesync_core as types;

/// Binary wire format (`scenesync-wire`).
///
/// Pure encode/decode functions plus [`wire::StreamReader`] for chunked
/// input and [`wire::BatchWriter`] for outbound batches.
pub use scenesync_wire as wire;

/// Reconciliation engine (`scenesync-engine`).
///
/// The single-writer [`engine::Session`], the multi-producer
/// [`engine::Ingress`] queue and the per-tick [`engine::SyncBuffer`].
pub use scenesync_engine as engine;

/// Common imports for typical scenesync usage.
///
/// ```rust
/// use scenesync::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use scenesync_core::{
        ComponentId, ComponentStorage, CrdtMessage, EntityId, Payload, ProcessedMessage,
        ReconciliationEffect, RejectReason, StateDelta, Timestamp,
    };

    // Errors
    pub use scenesync_core::{IngressError, LifecycleError};
    pub use scenesync_engine::ConfigError;
    pub use scenesync_wire::DecodeError;

    // Wire
    pub use scenesync_wire::{decode_batch, encode, encode_batch, BatchWriter, StreamReader};

    // Engine
    pub use scenesync_engine::{
        state_hash, EngineConfig, EntityAdmission, InboundBatch, Ingress, IngressSender,
        ReceiveReport, Session, SyncBuffer,
    };
}
