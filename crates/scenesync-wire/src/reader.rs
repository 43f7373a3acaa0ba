//! Incremental stream reassembly.
//!
//! [`StreamReader`] owns a receive buffer for transports that deliver a
//! batch in arbitrary chunks. Bytes are pushed as they arrive; each poll
//! decodes every complete message and keeps the unconsumed tail for the
//! next round.

use crate::codec::decode_batch_with;
use crate::types::{DecodeLimits, DecodedBatch};

/// Buffers partial input between decoder passes.
///
/// # Examples
///
/// ```
/// use scenesync_core::{CrdtMessage, EntityId};
/// use scenesync_wire::{encode, StreamReader};
///
/// let msg = CrdtMessage::DeleteEntity { entity: EntityId::new(1, 0) };
/// let bytes = encode(&msg);
///
/// let mut reader = StreamReader::new();
/// reader.push(&bytes[..10]);
/// assert!(reader.poll().messages.is_empty());
/// assert_eq!(reader.pending_bytes(), 10);
///
/// reader.push(&bytes[10..]);
/// assert_eq!(reader.poll().messages, vec![msg]);
/// assert_eq!(reader.pending_bytes(), 0);
/// ```
#[derive(Debug, Default)]
pub struct StreamReader {
    buf: Vec<u8>,
    limits: DecodeLimits,
    messages_read: u64,
}

impl StreamReader {
    /// Create a reader with default [`DecodeLimits`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader with explicit limits.
    pub fn with_limits(limits: DecodeLimits) -> Self {
        Self {
            buf: Vec::new(),
            limits,
            messages_read: 0,
        }
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode all complete messages and drop the consumed prefix.
    ///
    /// `bytes_consumed` of the returned batch is relative to the buffer as
    /// it stood before this call.
    pub fn poll(&mut self) -> DecodedBatch {
        let batch = decode_batch_with(&self.buf, &self.limits);
        self.buf.drain(..batch.bytes_consumed);
        self.messages_read += batch.messages.len() as u64;
        batch
    }

    /// Bytes received but not yet part of a complete message.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }

    /// Total messages decoded over the reader's lifetime.
    pub fn messages_read(&self) -> u64 {
        self.messages_read
    }

    /// Discard any buffered partial input.
    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
