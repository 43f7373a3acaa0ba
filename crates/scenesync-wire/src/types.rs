//! Decoder inputs and outputs.

use scenesync_core::CrdtMessage;

use crate::error::DecodeError;

/// Bounds the decoder enforces on untrusted input.
///
/// # Examples
///
/// ```
/// use scenesync_wire::DecodeLimits;
///
/// let limits = DecodeLimits::default();
/// assert_eq!(limits.max_message_len, DecodeLimits::DEFAULT_MAX_MESSAGE_LEN);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Largest declared message length the decoder will wait for.
    ///
    /// A length above this cannot be a legitimate message; it is treated as
    /// a framing error rather than as a message still in flight, otherwise
    /// a corrupt length would stall the stream forever.
    pub max_message_len: usize,
}

impl DecodeLimits {
    /// Default message length cap: 16 MiB.
    pub const DEFAULT_MAX_MESSAGE_LEN: usize = 16 * 1024 * 1024;
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_message_len: Self::DEFAULT_MAX_MESSAGE_LEN,
        }
    }
}

/// A message the decoder skipped, and why.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkippedMessage {
    /// Byte offset of the message within the decoded buffer.
    pub offset: usize,
    /// Number of bytes skipped.
    pub len: usize,
    /// The reason.
    pub error: DecodeError,
}

/// Result of decoding a buffer.
///
/// `bytes_consumed` covers every complete message, decoded or skipped.
/// Trailing bytes that do not yet form a full message are not consumed;
/// the caller keeps them and retries once more data has arrived.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Successfully decoded messages, in buffer order.
    pub messages: Vec<CrdtMessage>,
    /// Length of the consumed prefix.
    pub bytes_consumed: usize,
    /// Messages that were skipped, in buffer order.
    pub skipped: Vec<SkippedMessage>,
}

impl DecodedBatch {
    /// Whether nothing was decoded or skipped.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.skipped.is_empty()
    }
}
