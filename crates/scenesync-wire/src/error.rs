//! Decode-time error types.

use thiserror::Error;

/// Why a single message could not be decoded.
///
/// A `DecodeError` never fails a batch: the decoder records it against the
/// offending message, skips to the next length-delimited boundary, and
/// keeps going.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The declared length is smaller than the fixed layout of the
    /// message type (or too small to hold a type field at all).
    #[error("declared length {length} is below the minimum {minimum}")]
    LengthTooSmall {
        /// Declared total message length.
        length: u32,
        /// Minimum length for the message type.
        minimum: u32,
    },
    /// The type discriminant is not one this build understands.
    #[error("unknown message type {raw}")]
    UnknownType {
        /// The raw discriminant.
        raw: u32,
    },
    /// The payload length runs past the end of the message.
    #[error("payload length {data_len} exceeds the {available} bytes left in the message")]
    DataLengthOverflow {
        /// Declared payload length.
        data_len: u32,
        /// Bytes actually available for the payload.
        available: u32,
    },
    /// The length field cannot delimit a message (smaller than itself, or
    /// above the configured limit), so no resynchronization point exists
    /// and the rest of the buffer is discarded.
    #[error("unframeable message length {length}")]
    Unframeable {
        /// The declared length.
        length: u32,
    },
}

impl DecodeError {
    /// Whether the decoder could skip past this message and keep reading.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Unframeable { .. })
    }
}
