//! Binary wire format for scenesync CRDT messages.
//!
//! Encodes and decodes the compact, little-endian message layout that
//! carries entity/component updates between a sandboxed scene runtime,
//! the host engine and remote peers.
//!
//! # Architecture
//!
//! - [`encode`], [`encode_into`] and [`encode_batch`] produce the wire
//!   layout
//! - [`decode_batch`] consumes every complete message in a buffer, skipping
//!   malformed ones and leaving a partial tail unconsumed
//! - [`StreamReader`] reassembles batches delivered in arbitrary chunks
//! - [`BatchWriter`] accumulates an outbound batch
//!
//! Encoder and decoder are free functions with no captured state; they can
//! run on any thread, concurrently with reconciliation.
//!
//! # Format
//!
//! ```text
//! [Message 1] [Message 2] ... [Message N]
//!
//! Message = [length u32] [type u32] [entity_idx u32] [entity_gen u32]
//!           [component u32] [timestamp u32]      (PUT, DELETE_COMPONENT, APPEND)
//!           [data_len u32] [data ...]            (PUT, APPEND)
//! ```
//!
//! A batch has no header of its own; every message carries its total
//! length, which doubles as the resynchronization point after a skipped
//! message.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod reader;
pub mod types;
pub mod writer;

pub use codec::{
    decode_batch, decode_batch_with, decode_message, encode, encode_batch, encode_into,
    encoded_len, MAX_PAYLOAD_LEN,
};
pub use error::DecodeError;
pub use reader::StreamReader;
pub use types::{DecodeLimits, DecodedBatch, SkippedMessage};
pub use writer::BatchWriter;
