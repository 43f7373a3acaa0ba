//! Outbound batch assembly.
//!
//! [`BatchWriter`] encodes outgoing messages back to back into one
//! buffer, ready to hand to the transport once per tick.

use scenesync_core::CrdtMessage;

use crate::codec::{encode_into, encoded_len};

/// Accumulates encoded messages into an outbound batch.
///
/// # Examples
///
/// ```
/// use scenesync_core::{ComponentId, CrdtMessage, EntityId, Timestamp};
/// use scenesync_wire::{decode_batch, BatchWriter};
///
/// let mut writer = BatchWriter::new();
/// writer.push(&CrdtMessage::PutComponent {
///     entity: EntityId::new(3, 1),
///     component: ComponentId(7),
///     timestamp: Timestamp(10),
///     data: b"A".as_slice().into(),
/// });
/// writer.push(&CrdtMessage::DeleteEntity { entity: EntityId::new(4, 0) });
/// assert_eq!(writer.messages_written(), 2);
///
/// let bytes = writer.finish();
/// assert_eq!(decode_batch(&bytes).messages.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct BatchWriter {
    buf: Vec<u8>,
    messages_written: u64,
}

impl BatchWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with `capacity` bytes preallocated.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            messages_written: 0,
        }
    }

    /// Encode one message onto the end of the batch.
    pub fn push(&mut self, msg: &CrdtMessage) {
        encode_into(msg, &mut self.buf);
        self.messages_written += 1;
    }

    /// Encode every message from `messages`, in order.
    pub fn extend<'a, I>(&mut self, messages: I)
    where
        I: IntoIterator<Item = &'a CrdtMessage>,
    {
        for msg in messages {
            self.buf.reserve(encoded_len(msg));
            self.push(msg);
        }
    }

    /// Messages encoded since creation or the last [`take`](Self::take).
    pub fn messages_written(&self) -> u64 {
        self.messages_written
    }

    /// Current batch size in bytes.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// The encoded batch so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Hand off the current batch and start a fresh one, keeping the writer.
    pub fn take(&mut self) -> Vec<u8> {
        self.messages_written = 0;
        std::mem::take(&mut self.buf)
    }

    /// Consume the writer and return the encoded batch.
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}
